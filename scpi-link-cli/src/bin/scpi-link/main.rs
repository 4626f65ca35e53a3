use std::time::{Duration, Instant};

use scpi_link::{
	read_device, write_device, Address, AnyTransport, ExerciseOptions, Session, SessionOptions,
};

mod logging;
mod options;

use options::{ChurnArgs, Command, ExerciseArgs, Options};

fn main() {
	if let Err(()) = do_main(clap::Parser::parse()) {
		std::process::exit(1);
	}
}

fn do_main(options: Options) -> Result<(), ()> {
	logging::init(module_path!(), options.verbose as i8);
	match options.command {
		Command::Exercise(args) => run_exercise(args),
		Command::Churn(args) => run_churn(args),
	}
}

fn run_exercise(args: ExerciseArgs) -> Result<(), ()> {
	let descriptor = args.resolve();
	if descriptor.readings == 0 && descriptor.writes == 0 {
		log::info!("Nothing to do. See --help.");
		return Ok(());
	}

	let address: Address = descriptor
		.address
		.parse()
		.map_err(|e| log::error!("{}", e))?;

	let options = ExerciseOptions {
		session: SessionOptions {
			drain_limit: args.drain_limit,
			..SessionOptions::default()
		},
		poll_limit: args.poll_limit,
	};

	let start = Instant::now();

	read_device(&descriptor, &options, || address.connect())
		.map_err(|e| log::error!("{}", e))?;
	write_device(&descriptor, &options, || address.connect())
		.map_err(|e| log::error!("{}", e))?;

	log::info!("Done after {:.1} s.", start.elapsed().as_secs_f64());
	Ok(())
}

fn run_churn(args: ChurnArgs) -> Result<(), ()> {
	const CLOSE_WAIT: Duration = Duration::from_millis(200);

	if args.connections == 0 {
		log::info!("Nothing to do. See --help.");
		return Ok(());
	}

	let options = SessionOptions {
		timeout: Duration::from_millis(args.timeout_ms),
		..SessionOptions::default()
	};

	// Ten passes over the reachable devices, so each one gets opened,
	// queried while other connections are live, and closed again.
	let pool_size = 10 * args.devices.max(1);
	let address = Address::Lan {
		host: args.host.clone(),
	};

	let mut slots: Vec<Option<Session<AnyTransport>>> = Vec::new();
	slots.resize_with(args.connections, || None);
	let mut slot = 0;

	for round in 0..pool_size {
		if slots[slot].take().is_some() {
			log::info!("Closing connection in slot {}.", slot);
			std::thread::sleep(CLOSE_WAIT);
		}

		let start = Instant::now();
		let transport = address.connect().map_err(|e| log::error!("{}", e))?;
		log::info!(
			"Opened connection {} in {} ms.",
			round,
			start.elapsed().as_millis()
		);
		slots[slot] = Some(Session::attach(transport, 0, options.clone()));

		for (index, session) in slots.iter_mut().enumerate() {
			let Some(session) = session else {
				continue;
			};
			let start = Instant::now();
			match session.ask("*IDN?") {
				Ok(identity) => log::info!(
					"Slot {} answered in {} ms: {}",
					index,
					start.elapsed().as_millis(),
					identity.trim_end()
				),
				Err(e) => log::error!("Slot {}: {}", index, e),
			}
		}

		slot = (slot + 1) % args.connections;
	}

	log::info!("Done.");
	Ok(())
}
