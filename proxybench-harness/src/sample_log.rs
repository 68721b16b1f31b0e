use proxybench_common::{LatencySample, Result, Source, RUN_LOG_FILE};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The three newline-delimited JSON logs a run writes: one per source plus the
/// combined log.
#[derive(Debug, Clone)]
pub struct RunLogs {
    run_log: PathBuf,
    proxy_log: PathBuf,
    direct_log: PathBuf,
}

impl RunLogs {
    /// Logs under their fixed names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            run_log: dir.join(RUN_LOG_FILE),
            proxy_log: dir.join(Source::Proxied.log_file()),
            direct_log: dir.join(Source::Direct.log_file()),
        }
    }

    pub fn run_log(&self) -> &Path {
        &self.run_log
    }

    pub fn source_log(&self, source: Source) -> &Path {
        match source {
            Source::Direct => &self.direct_log,
            Source::Proxied => &self.proxy_log,
        }
    }

    /// Empty all three logs. Must happen before the first request of a run.
    pub fn truncate_all(&self) -> Result<()> {
        for path in [&self.run_log, &self.proxy_log, &self.direct_log] {
            File::create(path)?;
        }
        Ok(())
    }

    /// Append `sample` to its source log, then to the combined log.
    /// Both writes are attempted even if the first fails; the first error wins.
    pub fn append(&self, sample: &LatencySample) -> Result<()> {
        let line = sample.to_record().to_line()?;
        let source = append_line(self.source_log(sample.source), &line);
        let combined = append_line(&self.run_log, &line);
        source.and(combined)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}
