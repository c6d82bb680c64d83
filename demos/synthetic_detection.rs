use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rusty_hfo::config::{DetectorConfig, MeasurementMode};
use rusty_hfo::encoder::SignalToSpikeAlgorithm;
use rusty_hfo::error::HfoError;
use rusty_hfo::pipeline::{ChannelErrorPolicy, HfoDetector};
use rusty_hfo::simulator::{NetworkInput, Simulator};
use rusty_hfo::synthetic::{Burst, SyntheticRecording};

#[derive(Parser, Debug)]
struct Args {
    /// The seed used for recording sampling
    #[arg(long, default_value = "0")]
    seed: u64,
    /// The measurement mode, must be one of: ieeg, ecog, scalp
    #[arg(long, default_value = "ieeg")]
    mode: String,
    /// The spike encoding algorithm, must be one of: default, realistic
    #[arg(long, default_value = "default")]
    algorithm: String,
    /// A detector configuration file, overriding the mode and the algorithm
    #[arg(long)]
    config: Option<String>,
    /// The number of recording intervals
    #[arg(long, default_value = "2")]
    num_intervals: usize,
    /// The number of channels per interval
    #[arg(short = 'C', long, default_value = "4")]
    num_channels: usize,
    /// The sampling frequency (in Hz)
    #[arg(long, default_value = "2000.0")]
    sampling_frequency: f64,
    /// The length of each interval (in seconds)
    #[arg(short = 'T', long, default_value = "20.0")]
    duration: f64,
    /// The standard deviation of the background noise
    #[arg(long, default_value = "1.0")]
    noise_std: f64,
    /// The oscillation frequency of the injected bursts (in Hz)
    #[arg(long, default_value = "180.0")]
    burst_frequency: f64,
    /// The peak amplitude of the injected bursts
    #[arg(long, default_value = "15.0")]
    burst_amplitude: f64,
    /// The number of input spikes within the coincidence window for the network to fire
    #[arg(long, default_value = "6")]
    min_coincidences: usize,
    /// The coincidence window of the network (in seconds)
    #[arg(long, default_value = "0.005")]
    coincidence_window: f64,
    /// The log file, the console if none
    #[arg(long)]
    log: Option<String>,
}

/// A stand-in for the network: fires whenever enough input spikes fall within a short window,
/// then stays silent for that window.
struct CoincidenceSimulator {
    min_coincidences: usize,
    window: f64,
    input: Vec<f64>,
}

impl Simulator for CoincidenceSimulator {
    fn prepare(&mut self, input: &NetworkInput, duration: f64) -> Result<(), HfoError> {
        if !(duration > 0.0) {
            return Err(HfoError::SimulationError(format!(
                "cannot run the network for {} seconds",
                duration
            )));
        }
        self.input = input.main.times().to_vec();
        Ok(())
    }

    fn run(&mut self, duration: f64) -> Result<Vec<f64>, HfoError> {
        let mut output: Vec<f64> = vec![];
        let mut first = 0;
        for (last, &time) in self.input.iter().enumerate() {
            if time > duration {
                break;
            }
            while self.input[first] < time - self.window {
                first += 1;
            }
            let refractory = output.last().is_some_and(|t| time - t < self.window);
            if last + 1 - first >= self.min_coincidences && !refractory {
                output.push(time);
            }
        }
        Ok(output)
    }
}

fn init_logger(path: Option<&str>) -> Result<(), HfoError> {
    let encoder = Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} - {m}\n"));
    let appender = match path {
        Some(path) => Appender::builder().build(
            "logfile",
            Box::new(
                FileAppender::builder()
                    .encoder(encoder)
                    .build(path)
                    .map_err(|e| HfoError::IOError(e.to_string()))?,
            ),
        ),
        None => Appender::builder().build(
            "logfile",
            Box::new(ConsoleAppender::builder().encoder(encoder).build()),
        ),
    };

    let config = Config::builder()
        .appender(appender)
        .build(Root::builder().appender("logfile").build(LevelFilter::Info))
        .map_err(|e| HfoError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| HfoError::IOError(e.to_string()))?;
    Ok(())
}

fn main() -> Result<(), HfoError> {
    let args = Args::parse();
    init_logger(args.log.as_deref())?;

    log::info!("{:?}", args);

    let config = match &args.config {
        Some(path) => DetectorConfig::load_from(path)?,
        None => {
            let mut config = DetectorConfig::new(args.mode.parse::<MeasurementMode>()?);
            config.algorithm = args.algorithm.parse::<SignalToSpikeAlgorithm>()?;
            config
        }
    };

    // Sample the recordings, one burst every two seconds after the calibration prefix
    let mut recording =
        SyntheticRecording::build(args.sampling_frequency, args.duration, args.noise_std)?;
    let mut start = config.calibration_time + 1.0;
    while start + 0.1 < args.duration {
        recording.add_burst(Burst::new(
            start,
            0.08,
            args.burst_frequency,
            args.burst_amplitude,
        ))?;
        start += 2.0;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let intervals = (1..=args.num_intervals)
        .map(|number| recording.sample_interval(number, args.num_channels, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;
    log::info!(
        "Recording sampling: done! {} intervals with {} bursts each",
        intervals.len(),
        recording.bursts().len()
    );

    // Run the detection with one network per channel
    let detector = HfoDetector::build(config)?
        .with_error_policy(ChannelErrorPolicy::Skip)
        .with_callback(|run| {
            log::info!(
                "Interval {}, channel {} ({}): {} HFOs at {:?}",
                run.metadata.interval,
                run.metadata.channel,
                run.metadata.label,
                run.detection.result.total_amount,
                run.detection.result.periods.start
            );
        });
    let runs = detector.run_parallel(&intervals, || {
        Ok(CoincidenceSimulator {
            min_coincidences: args.min_coincidences,
            window: args.coincidence_window,
            input: vec![],
        })
    })?;

    let total: usize = runs
        .iter()
        .map(|run| run.detection.result.total_amount)
        .sum();
    log::info!(
        "Detection: done! {} HFOs over {} channels ({} injected bursts per channel)",
        total,
        runs.len(),
        recording.bursts().len()
    );
    Ok(())
}
