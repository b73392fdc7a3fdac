//! One-off exercises of each output, for installation checks.

use std::path::Path;

use clap::Subcommand;
use smartlid_core::hardware::ServoTiming;
use smartlid_core::{Clock, Config, LineMessaging, Notifier, Stage, SystemClock};

use super::{load_config, open_actuator, open_player, CmdResult};

#[derive(Subcommand)]
pub enum TestAction {
    /// Send one LINE alert dated today
    Notify {
        /// Count to put in the message
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Send today's LINE daily report
    Summary {
        /// Total to report
        #[arg(long, default_value = "0")]
        count: u32,
    },
    /// Push a system test message to check the LINE token and user id
    Connection,
    /// Run the servo push once
    Push,
    /// Play a stage sound
    Sound {
        /// 1 (mild) or 2 (severe)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
        stage: u8,
    },
}

pub fn run(config_path: Option<&Path>, action: TestAction) -> CmdResult {
    let config = load_config(config_path)?;
    match action {
        TestAction::Notify { count } => {
            let line = line_client(&config)?;
            let today = SystemClock.today();
            tokio::runtime::Runtime::new()?.block_on(line.send_alert(count, today))?;
            println!("LINE alert sent (count {count}, {today})");
        }
        TestAction::Summary { count } => {
            let line = line_client(&config)?;
            let today = SystemClock.today();
            tokio::runtime::Runtime::new()?.block_on(line.send_daily_summary(today, count))?;
            println!("LINE daily report sent ({today}, total {count})");
        }
        TestAction::Connection => {
            let line = line_client(&config)?;
            tokio::runtime::Runtime::new()?.block_on(line.test_connection())?;
            println!("LINE connection ok");
        }
        TestAction::Push => {
            let timing = ServoTiming::from(&config.servo);
            let actuator = open_actuator(&config, config.hardware.backend)?;
            let result = actuator.push();
            actuator.release();
            result?;
            println!("push complete ({:.1}s)", timing.total().as_secs_f64());
        }
        TestAction::Sound { stage } => {
            let stage = if stage == 1 { Stage::Mild } else { Stage::Severe };
            let path = stage.sound(&config.sounds);
            let player = open_player()?;
            let result = player.play(path);
            player.release();
            result?;
            println!("played {}", path.display());
        }
    }
    Ok(())
}

fn line_client(config: &Config) -> Result<LineMessaging, Box<dyn std::error::Error>> {
    let line = LineMessaging::new(&config.line)?
        .with_summary_threshold(config.alert.daily_alert_threshold);
    if !line.is_enabled() {
        return Err(
            "LINE credentials are not configured (LINE_CHANNEL_ACCESS_TOKEN, LINE_USER_ID)".into(),
        );
    }
    Ok(line)
}
