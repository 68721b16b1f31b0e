use chrono::{SecondsFormat, Utc};
use proxybench_client::{ChatBackend, ChatResponse};
use proxybench_common::{
    prompt_preview, LatencySample, Prompt, Result, Source, PROMPT_PREVIEW_CHARS,
};
use tokio::time::Instant;

use crate::sample_log::RunLogs;
use crate::stats::{mean, median};

/// One timed request: the sample, what the backend returned, and whether the
/// sample made it into the logs.
pub struct Attempt {
    pub sample: LatencySample,
    pub result: Result<ChatResponse>,
    pub logged: Result<()>,
}

/// Every sample produced by a run, per phase, in issue order.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub proxied: Vec<LatencySample>,
    pub direct: Vec<LatencySample>,
}

impl RunOutcome {
    pub fn samples(&self, source: Source) -> &[LatencySample] {
        match source {
            Source::Direct => &self.direct,
            Source::Proxied => &self.proxied,
        }
    }

    /// Latencies of the attempts that succeeded, in issue order.
    pub fn successful_millis(&self, source: Source) -> Vec<f64> {
        self.samples(source)
            .iter()
            .filter(|s| s.is_success())
            .map(|s| s.elapsed_millis)
            .collect()
    }

    /// Count/mean/median lines for both sources, or `None` if either has no
    /// successful attempt.
    pub fn summary(&self) -> Option<Vec<String>> {
        let direct = self.successful_millis(Source::Direct);
        let proxied = self.successful_millis(Source::Proxied);
        Some(vec![
            summary_line("Direct", &direct)?,
            summary_line("Proxy", &proxied)?,
        ])
    }
}

fn summary_line(label: &str, millis: &[f64]) -> Option<String> {
    Some(format!(
        "{label} requests - Count: {}, Mean: {:.2}ms, Median: {:.2}ms",
        millis.len(),
        mean(millis)?,
        median(millis)?,
    ))
}

fn phase_title(source: Source) -> &'static str {
    match source {
        Source::Direct => "Direct",
        Source::Proxied => "Proxy",
    }
}

/// Console line announcing request `n` of `total`. `n` is 1-based.
pub fn progress_line(source: Source, n: usize, total: usize, prompt: &str) -> String {
    let head: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!("Running {} request {n}/{total}: {head}...", source.as_name())
}

fn ns_to_ms(ns: u128) -> f64 {
    ns as f64 / 1_000_000.0
}

/// Issue one request, time it, and append the resulting sample to the logs.
///
/// A failed request still produces a logged sample; the failure is returned in
/// [`Attempt::result`]. A log write failure is returned in [`Attempt::logged`].
pub async fn make_request(
    backend: &dyn ChatBackend,
    prompt: &str,
    source: Source,
    logs: &RunLogs,
) -> Attempt {
    let start = Instant::now();
    let result = backend.issue_chat_request(prompt).await;
    let elapsed_millis = ns_to_ms(start.elapsed().as_nanos());

    if let Err(e) = &result {
        println!("Error in {} request: {e}", source.as_name());
    }

    let sample = LatencySample {
        source,
        elapsed_millis,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        prompt_preview: prompt_preview(prompt),
        error: result.as_ref().err().map(ToString::to_string),
    };
    let logged = logs.append(&sample);

    Attempt { sample, result, logged }
}

/// Run every prompt through `backend`, one at a time, in order.
/// Request and log write failures are reported and skipped over; they never
/// end the phase.
pub async fn run_phase(
    backend: &dyn ChatBackend,
    prompts: &[Prompt],
    source: Source,
    logs: &RunLogs,
) -> Vec<LatencySample> {
    let title = phase_title(source);
    println!("\n--- Running {title} Requests ---");

    let total = prompts.len();
    let mut samples = Vec::with_capacity(total);
    for (i, prompt) in prompts.iter().enumerate() {
        println!("{}", progress_line(source, i + 1, total, &prompt.text));

        let attempt = make_request(backend, &prompt.text, source, logs).await;
        if let Err(e) = &attempt.result {
            println!("{title} request failed: {e}");
        }
        if let Err(e) = &attempt.logged {
            println!("{title} request failed: {e}");
        }
        samples.push(attempt.sample);
    }

    tracing::info!(
        source = source.as_name(),
        attempts = samples.len(),
        failures = samples.iter().filter(|s| !s.is_success()).count(),
        "phase complete"
    );
    samples
}

/// Truncate the logs, then run the proxied phase to completion followed by the
/// direct phase.
pub async fn run(
    proxy: &dyn ChatBackend,
    direct: &dyn ChatBackend,
    prompts: &[Prompt],
    logs: &RunLogs,
) -> Result<RunOutcome> {
    logs.truncate_all()?;

    let proxied = run_phase(proxy, prompts, Source::Proxied, logs).await;
    let direct = run_phase(direct, prompts, Source::Direct, logs).await;

    Ok(RunOutcome { proxied, direct })
}
