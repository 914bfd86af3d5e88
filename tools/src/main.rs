use std::fs;
use std::path::{Path, PathBuf};

use character_motor_fps::DriveMode;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use physics_rapier::PhysicsWorld;
use player_controller::driver::RapierCharacter;
use player_controller::{ControllerConfig, FpsController, InputSnapshot};
use rapier3d::prelude::{vector, ColliderBuilder, ColliderHandle, Real};

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_CONFIG: i32 = 10;
const EXIT_SIMULATION: i32 = 11;

#[derive(Parser)]
#[command(name = "tools", version, about = "First-person controller tools CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted headless walk over a floor and ramp.
    Simulate(SimulateArgs),
    Config(ConfigArgs),
}

#[derive(Parser)]
struct SimulateArgs {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides the drive mode from the config file.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, default_value_t = 240)]
    ticks: u32,

    #[arg(long, default_value_t = 60.0)]
    hz: Real,

    /// Ticks on which the jump key goes down (released on the next tick).
    #[arg(long, value_delimiter = ',')]
    jump_at: Vec<u32>,

    /// Hold the run modifier for the whole walk.
    #[arg(long)]
    run: bool,

    /// Look input added every tick, in raw units.
    #[arg(long, default_value_t = 0.0)]
    turn: Real,

    #[arg(long, default_value_t = 20.0)]
    ramp_deg: Real,

    #[arg(long, default_value_t = 10)]
    print_every: u32,
}

#[derive(ValueEnum, Clone, Copy)]
enum ModeArg {
    Velocity,
    Position,
}

impl From<ModeArg> for DriveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Velocity => DriveMode::Velocity,
            ModeArg::Position => DriveMode::Position,
        }
    }
}

#[derive(Parser)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate a controller config file.
    Check {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Print the default controller config as TOML.
    Defaults,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Simulate(args) => run_simulate(args),
        Commands::Config(args) => run_config(args),
    };
    std::process::exit(exit_code);
}

fn run_simulate(args: SimulateArgs) -> i32 {
    if !args.hz.is_finite() || args.hz <= 0.0 {
        eprintln!("--hz must be > 0");
        return EXIT_USAGE;
    }
    let mut config = match args.config.as_deref() {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(code) => return code,
        },
        None => ControllerConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.drive_mode = mode.into();
    }

    let dt = 1.0 / args.hz;
    let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
    build_scene(&mut world, args.ramp_deg.to_radians());
    world.step(dt);

    let start = vector![0.0, config.capsule_height * 0.5 + 0.5, 0.0];
    let mut character = RapierCharacter::spawn(&mut world, &config, start);
    let mut controller: FpsController<ColliderHandle> = FpsController::new(config, start);
    info!(
        "simulating {} ticks at {} Hz ({:?} drive)",
        args.ticks,
        args.hz,
        controller.drive_mode()
    );

    println!("tick      x       y       z      vx      vy      vz  ground");
    let mut grounded_ticks = 0u32;
    for tick in 0..args.ticks {
        let raw = InputSnapshot {
            look_delta: [args.turn, 0.0],
            move_axis: [0.0, 1.0],
            jump: args.jump_at.contains(&tick),
            run: args.run,
        };
        let frame = character.step(&mut world, &mut controller, &raw, dt);
        if frame.grounded {
            grounded_ticks += 1;
        }
        let state = controller.state();
        if !state.position.iter().all(|v| v.is_finite()) {
            eprintln!("simulation diverged at tick {}", tick);
            return EXIT_SIMULATION;
        }
        if args.print_every > 0 && (tick % args.print_every == 0 || frame.jumped) {
            println!(
                "{:>4} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>7.3}  {}{}",
                tick,
                state.position.x,
                state.position.y,
                state.position.z,
                frame.velocity.x,
                frame.velocity.y,
                frame.velocity.z,
                frame.grounded,
                if frame.jumped { " jump" } else { "" }
            );
        }
    }

    let stats = controller.classifier_stats();
    println!(
        "done: grounded {}/{} ticks, contacts accepted={} stale={} too_steep={} unverified={}",
        grounded_ticks, args.ticks, stats.accepted, stats.stale, stats.too_steep, stats.unverified
    );
    EXIT_SUCCESS
}

/// Floor plus a ramp rising away from the start position along -Z.
fn build_scene(world: &mut PhysicsWorld, ramp_angle: Real) {
    let floor = ColliderBuilder::cuboid(50.0, 0.1, 50.0)
        .translation(vector![0.0, -0.1, 0.0])
        .build();
    world.insert_static_collider(floor);
    if ramp_angle > 0.0 {
        let half_length = 6.0;
        let ramp = ColliderBuilder::cuboid(3.0, 0.1, half_length)
            .rotation(vector![ramp_angle, 0.0, 0.0])
            .translation(vector![
                0.0,
                half_length * ramp_angle.sin() - 0.1,
                -10.0 - half_length * ramp_angle.cos()
            ])
            .build();
        world.insert_static_collider(ramp);
    }
}

fn run_config(args: ConfigArgs) -> i32 {
    match args.command {
        ConfigCommand::Check { path } => match load_config(&path) {
            Ok(config) => {
                for warning in config.validate().warnings {
                    println!("warning: {}", warning);
                }
                println!("config ok: {}", path.display());
                EXIT_SUCCESS
            }
            Err(code) => code,
        },
        ConfigCommand::Defaults => match ControllerConfig::default().to_toml() {
            Ok(text) => {
                print!("{}", text);
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("{}", err);
                EXIT_CONFIG
            }
        },
    }
}

fn load_config(path: &Path) -> Result<ControllerConfig, i32> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read {}: {}", path.display(), err);
            return Err(EXIT_CONFIG);
        }
    };
    ControllerConfig::load_toml(&text).map_err(|err| {
        eprintln!("{}: {}", path.display(), err);
        EXIT_CONFIG
    })
}
