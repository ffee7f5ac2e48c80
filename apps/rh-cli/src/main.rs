mod plant;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rh_zone::{load_zone_config, ControlLoop, Mode, ZoneConfig, ZoneResult};

use crate::plant::ThermalPlant;

#[derive(Parser)]
#[command(name = "rh-cli")]
#[command(about = "Radiant floor-heating control core - validation and simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a zone configuration file
    Validate {
        /// Path to the zone YAML file
        config_path: PathBuf,
    },
    /// Print a default zone configuration as YAML
    Defaults,
    /// Run a closed-loop simulation against a simple thermal plant
    Simulate {
        /// Path to the zone YAML file
        config_path: PathBuf,
        /// Simulated duration in hours
        #[arg(long, default_value_t = 12.0)]
        hours: f64,
        /// Tick interval in seconds
        #[arg(long, default_value_t = 60.0)]
        tick: f64,
        /// Room setpoint override
        #[arg(long)]
        target: Option<f64>,
        /// Starting floor/room temperature
        #[arg(long, default_value_t = 16.0)]
        initial_temp: f64,
        /// Outdoor/ambient temperature
        #[arg(long, default_value_t = 10.0)]
        ambient: f64,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ZoneResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Defaults => cmd_defaults(),
        Commands::Simulate {
            config_path,
            hours,
            tick,
            target,
            initial_temp,
            ambient,
            output,
        } => cmd_simulate(
            &config_path,
            hours,
            tick,
            target,
            initial_temp,
            ambient,
            output.as_deref(),
        ),
    }
}

fn cmd_validate(config_path: &Path) -> ZoneResult<()> {
    println!("Validating zone config: {}", config_path.display());
    let config = load_zone_config(config_path)?;
    println!("✓ Zone config is valid");
    println!(
        "  {} - {} floor sensor(s), {} room sensor(s), {} heater(s), {:.0} W total",
        config.name,
        config.floor_sensors.len(),
        config.room_sensors.len(),
        config.heaters.len(),
        config.heaters.iter().map(|h| h.power).sum::<f64>(),
    );
    Ok(())
}

fn cmd_defaults() -> ZoneResult<()> {
    let config = ZoneConfig::default();
    println!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    config_path: &Path,
    hours: f64,
    tick: f64,
    target: Option<f64>,
    initial_temp: f64,
    ambient: f64,
    output: Option<&Path>,
) -> ZoneResult<()> {
    let config = load_zone_config(config_path)?;
    let heaters: Vec<_> = config
        .heaters
        .iter()
        .map(|h| (h.id.clone(), h.power))
        .collect();
    let num_floor = config.floor_sensors.len();
    let num_room = config.room_sensors.len();
    let num_power = config.power_sensors.len();

    let mut control = ControlLoop::new(config, 0.0)?;
    if let Some(target) = target {
        control.set_target_temp(target);
    }
    control.set_mode(Mode::Heat);

    let mut plant = ThermalPlant::new(initial_temp, ambient, &heaters);

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(io::stdout()),
    };
    writeln!(
        writer,
        "time_s,floor_temp,room_temp,final_demand,room_demand,floor_demand,\
         effective_floor_limit,safety_veto,heater_power_w,relay_toggles"
    )?;

    let steps = (hours * 3600.0 / tick).ceil() as u64;
    for i in 0..steps {
        let now = i as f64 * tick;
        let outputs = control.step(&plant.inputs(now, num_floor, num_room, num_power));
        for command in &outputs.commands {
            plant.set_relay(&command.id, command.on);
        }
        plant.advance(tick);

        let s = &outputs.status;
        writeln!(
            writer,
            "{now:.0},{:.2},{:.2},{:.1},{:.1},{:.1},{:.1},{},{:.0},{}",
            plant.floor_temp,
            plant.room_temp,
            s.final_demand,
            s.room_demand,
            s.floor_demand,
            s.effective_floor_limit,
            u8::from(s.safety_veto_active),
            plant.active_power(),
            s.relay_toggle_count,
        )?;
    }

    tracing::info!(
        steps,
        final_floor = plant.floor_temp,
        final_room = plant.room_temp,
        relay_toggles = control.relay_toggle_count(),
        "simulation finished"
    );
    if let Some(path) = output {
        println!("✓ Simulation complete: {} steps -> {}", steps, path.display());
    }
    Ok(())
}
