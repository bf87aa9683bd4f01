use std::env;

use anyhow::Context;
use log::{info, warn};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use predictor::{
    Configuration, IncrementalTrainer, PredictorErr, TrainingEvent, command::Command,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => Configuration::from_json_file(&path)
            .with_context(|| format!("failed to load the configuration at {path}"))?,
        None => Configuration::default(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut trainer = IncrementalTrainer::new(config)?.with_events(tx);
    info!("ready, architecture {}", trainer.configuration().architecture);

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }

        if let Err(e) = run(&mut trainer, command).await {
            warn!("{e}");
            eprintln!("{e}");
        }

        // Drains what the last command produced without waiting for more.
        while let Ok(event) = rx.try_recv() {
            print_event(&event);
        }

        if matches!(command, Command::Observe(_) | Command::Show) {
            show(&trainer);
        }
    }

    Ok(())
}

async fn run(trainer: &mut IncrementalTrainer, command: Command) -> Result<(), PredictorErr> {
    if let Some(config) = command.reconfigured(trainer.configuration()) {
        if &config != trainer.configuration() {
            trainer.reconfigure(config)?;
        }
        return Ok(());
    }

    let Command::Observe(digit) = command else {
        return Ok(());
    };

    if let Some(retraining) = trainer.observe(digit)? {
        retraining.wait().await?;
    }

    Ok(())
}

fn show(trainer: &IncrementalTrainer) {
    let sequence: Vec<_> = trainer.sequence().iter().map(|d| d.to_string()).collect();
    println!("sequence: [{}]", sequence.join(", "));

    if let Some(last) = trainer.trace().last() {
        println!("loss after epoch {}: {:.4}", last.epoch, last.loss);
    }

    match trainer.prediction() {
        Some(prediction) => {
            let probs: Vec<_> = prediction
                .class_probabilities()
                .iter()
                .map(|p| format!("{p:.3}"))
                .collect();
            println!("next digit: {}", prediction.predicted_class());
            println!("probabilities: [{}]", probs.join(", "));
        }
        None => println!("next digit: enter at least two digits"),
    }
}

fn print_event(event: &TrainingEvent) {
    match event {
        TrainingEvent::Started { pairs, epochs } => {
            println!("training on {pairs} pairs for {epochs} epochs")
        }
        TrainingEvent::Epoch(point) => println!("  epoch {}: loss {:.4}", point.epoch, point.loss),
        TrainingEvent::Predicted(_) => {}
        TrainingEvent::Failed(msg) => println!("training failed: {msg}"),
        TrainingEvent::Reset(config) => println!(
            "reset: {} with {} units, {} epochs per digit",
            config.architecture, config.hidden_units, config.epochs_per_step
        ),
    }
}
