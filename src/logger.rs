use std::{io, path::Path};

pub fn setup_logging(
    verbosity: log::LevelFilter,
    log_file: Option<&Path>,
) -> Result<(), fern::InitError> {
    let base_config = fern::Dispatch::new()
        .level(verbosity)
        // hyper and reqwest are chatty at debug
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info);

    let mut output_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(io::stdout());

    if let Some(path) = log_file {
        output_config = output_config.chain(fern::log_file(path)?);
    }

    base_config.chain(output_config).apply()?;

    Ok(())
}
