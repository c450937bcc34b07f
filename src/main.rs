use log::{error, info, LevelFilter};
use stackfm::runtime::native;
use stackfm::synth::Patch;

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("cpal", LevelFilter::Warn)
        .init()
    {
        eprintln!("Failed to install logger: {}", err);
    }

    // stackfm [patch.json] [output device]
    let mut args = std::env::args().skip(1);
    let patch = match args.next() {
        Some(path) => match Patch::load(&path) {
            Ok(patch) => {
                info!("Loaded patch {}", path);
                patch
            }
            Err(err) => {
                error!("Could not load {}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => Patch::default(),
    };

    if let Err(err) = native::start(patch, args.next()) {
        error!("{}", err);
        std::process::exit(1);
    }
}
