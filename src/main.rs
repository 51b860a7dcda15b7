use chiffrage::cli::{commands, Cli, Commands, GlobalOpts};
use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` ends quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Product(cmd) => commands::product::run(cmd, &global),
        Commands::Category(cmd) => commands::category::run(cmd, &global),
        Commands::Param(cmd) => commands::param::run(cmd, &global),
        Commands::Import(args) => commands::import::run(args, &global),
        Commands::Export(args) => commands::export::run(args, &global),
        Commands::Cart(cmd) => commands::cart::run(cmd, &global),
        Commands::Associate(args) => commands::associate::run(args, &global),
        Commands::Db(cmd) => commands::db::run(cmd, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chiffrage={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
