//! `process-result`: parse newweb experiment logs and analyze the results.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use env_logger::Env;
use log::info;

use newweb_results::analysis::{self, report, AnalyzeOptions};
use newweb_results::config::{self, Config};
use newweb_results::{parser, persist};

#[derive(Parser, Debug)]
#[command(name = "process-result")]
#[command(about = "Parse newweb simulation logs and analyze page-load results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse the logs of one experiment into a result file
    Parse {
        /// Experiment directory holding shadow.log and shadow.data/
        expdir: PathBuf,

        /// Free-form description embedded in the result file
        #[arg(short, long, default_value = "")]
        description: String,

        /// Overwrite an existing result file
        #[arg(short, long)]
        force: bool,

        /// Result file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze one or more result files
    Analyze {
        /// Result files written by `parse`
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Only print information about the result files
        #[arg(long)]
        show_info_only: bool,

        /// Only compute page-load statistics
        #[arg(long)]
        web_only: bool,

        /// Only consider loads of this url (repeatable)
        #[arg(long = "web-url")]
        web_urls: Vec<String>,

        /// CDF bucket size for time to first byte, in seconds
        #[arg(long = "web-ttfb-bucketsize")]
        web_ttfb_bucket_size: Option<f64>,

        /// CDF bucket size for page load time, in seconds
        #[arg(long = "web-plt-bucketsize")]
        web_plt_bucket_size: Option<f64>,

        /// Prefix for output CDF files
        #[arg(long)]
        output_cdf_prefix: Option<String>,

        /// Only consider loads starting at or after this virtual time (hr:min:sec)
        #[arg(long = "startAfter")]
        start_after: Option<String>,

        /// Only consider loads completing at or before this virtual time (hr:min:sec)
        #[arg(long = "doneBefore")]
        done_before: Option<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Parse {
            expdir,
            description,
            force,
            output,
        } => {
            if let Some(output) = output {
                config.parse.output_file = output.to_string_lossy().into_owned();
            }
            config.parse.validate()?;
            run_parse(&expdir, &config, &description, force)
        }
        Commands::Analyze {
            files,
            show_info_only,
            web_only,
            web_urls,
            web_ttfb_bucket_size,
            web_plt_bucket_size,
            output_cdf_prefix,
            start_after,
            done_before,
        } => {
            let analyze = &mut config.analyze;
            if let Some(size) = web_ttfb_bucket_size {
                analyze.web_ttfb_bucket_size = size;
            }
            if let Some(size) = web_plt_bucket_size {
                analyze.web_plt_bucket_size = size;
            }
            if let Some(prefix) = output_cdf_prefix {
                analyze.output_cdf_prefix = prefix;
            }
            if let Some(start_after) = start_after {
                analyze.start_after = start_after;
            }
            if done_before.is_some() {
                analyze.done_before = done_before;
            }

            let mut options = AnalyzeOptions::from_config(analyze)?;
            options.filter.urls = web_urls.into_iter().collect();
            options.show_info_only = show_info_only;
            options.web_only = web_only;

            let command_line = std::env::args().collect::<Vec<_>>().join(" ");
            run_analyze(&files, &options, &command_line)
        }
    }
}

/// An existing output is kept unless `force` is set.
fn should_write_output(output: &Path, force: bool) -> bool {
    force || !output.exists()
}

fn run_parse(expdir: &Path, config: &Config, description: &str, force: bool) -> Result<()> {
    let output = PathBuf::from(&config.parse.output_file);
    if !should_write_output(&output, force) {
        info!("output file path \"{}\" already exists", output.display());
        return Ok(());
    }

    info!("Parsing experiment {}", expdir.display());
    let result = parser::parse_experiment(expdir, &config.parse, description)
        .with_context(|| format!("Failed to parse experiment: {}", expdir.display()))?;
    persist::save_result(&result, &output)
}

fn run_analyze(files: &[PathBuf], options: &AnalyzeOptions, command_line: &str) -> Result<()> {
    let outcome = analysis::run_analysis(files, options, command_line)?;
    report::print_file_info(&outcome.info_lines);

    if let Some(web) = &outcome.web {
        report::print_web_summary(web);
    }
    if let Some(totals) = &outcome.csp_totals {
        report::print_traffic_totals("client-side proxy totals", totals);
    }
    if let Some(totals) = &outcome.handler_totals {
        report::print_traffic_totals("exit-side handler totals", totals);
    }
    info!("{} CDF files written", outcome.cdf_files.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from(["process-result", "parse", "exp1", "-d", "baseline run", "--force"]);
        match cli.command {
            Commands::Parse {
                expdir,
                description,
                force,
                output,
            } => {
                assert_eq!(expdir, PathBuf::from("exp1"));
                assert_eq!(description, "baseline run");
                assert!(force);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from([
            "process-result",
            "--log-level",
            "debug",
            "analyze",
            "a.bin.zst",
            "b.bin.zst",
            "--web-url",
            "http://a/",
            "--web-url",
            "http://b/",
            "--web-plt-bucketsize",
            "1",
            "--startAfter",
            "00:10:00",
            "--doneBefore",
            "01:00:00",
            "--web-only",
        ]);
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Analyze {
                files,
                web_urls,
                web_plt_bucket_size,
                web_ttfb_bucket_size,
                start_after,
                done_before,
                web_only,
                show_info_only,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(web_urls, vec!["http://a/", "http://b/"]);
                assert_eq!(web_plt_bucket_size, Some(1.0));
                assert_eq!(web_ttfb_bucket_size, None);
                assert_eq!(start_after.as_deref(), Some("00:10:00"));
                assert_eq!(done_before.as_deref(), Some("01:00:00"));
                assert!(web_only);
                assert!(!show_info_only);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn write_experiment(expdir: &Path) {
        std::fs::create_dir_all(expdir.join("shadow.data/hosts")).unwrap();
        let log = [
            "00:00:00.021258 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:143] [master_run] Shadow v1.11.2 2016-10-04 (built 2016-11-11)",
            "00:00:00.021370 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:153] [master_run] Shadow initialized at 2016-11-19 00:14:35 using GLib v2.48.1",
            "00:00:00.000000 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:88] [master_free] Shadow v1.11.2 2016-10-04 (built 2016-11-11) shut down cleanly at 2016-11-19 03:31:09",
        ]
        .join("\n");
        std::fs::write(expdir.join("shadow.log"), log).unwrap();
    }

    fn config_with_output(output: &Path) -> Config {
        let mut config = Config::default();
        config.parse.output_file = output.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_existing_output_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("parsed.bin.zst");
        std::fs::write(&output, "previous").unwrap();
        assert!(!should_write_output(&output, false));

        // the missing experiment is never read
        run_parse(&dir.path().join("missing"), &config_with_output(&output), "", false).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn test_force_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let expdir = dir.path().join("exp");
        write_experiment(&expdir);
        let output = dir.path().join("parsed.bin.zst");
        std::fs::write(&output, "previous").unwrap();
        assert!(should_write_output(&output, true));

        run_parse(&expdir, &config_with_output(&output), "rerun", true).unwrap();
        let result = persist::load_result(&output).unwrap();
        assert_eq!(result.description(), "rerun");
        assert_eq!(result.completion_time(), "2016-11-19 03:31:09");
    }

    #[test]
    fn test_missing_output_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let expdir = dir.path().join("exp");
        write_experiment(&expdir);
        let output = dir.path().join("parsed.bin.zst");
        assert!(should_write_output(&output, false));

        run_parse(&expdir, &config_with_output(&output), "", false).unwrap();
        assert!(persist::load_result(&output).unwrap().load_results().is_empty());
    }

    #[test]
    fn test_analyze_requires_files() {
        assert!(Cli::try_parse_from(["process-result", "analyze"]).is_err());
    }
}
