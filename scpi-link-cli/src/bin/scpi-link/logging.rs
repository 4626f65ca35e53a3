use std::io::Write;

pub fn init(root_module: &str, verbosity: i8) {
	let log_level = match verbosity {
		i8::MIN..=-1 => log::LevelFilter::Warn,
		0 => log::LevelFilter::Info,
		1 => log::LevelFilter::Debug,
		2.. => log::LevelFilter::Trace,
	};

	env_logger::Builder::new()
		.format(|buffer, record| match record.level() {
			log::Level::Error | log::Level::Warn => {
				let style = buffer.default_level_style(record.level());
				writeln!(buffer, "{}: {}", style.value(record.level()), record.args())
			},
			_ => writeln!(buffer, "{}", record.args()),
		})
		.filter_level(log::LevelFilter::Warn)
		.filter_module(root_module, log_level)
		.filter_module("scpi_link", log_level)
		.init();
}
