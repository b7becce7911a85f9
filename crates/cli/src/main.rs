//! jssg CLI entry point
//!
//! Delegates everything to the library.

use clap::Parser;

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))
    .ok();

    let cli = jssg::Cli::parse();

    if let Err(e) = jssg::run(cli) {
        let report = miette::Report::msg(format!("{e:#}"));
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}
