mod colors;

use self::colors::*;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use std::path::PathBuf;
use system_upgrade::{
    misc::format_error,
    options::{CleanMode, RawOptions, RepoActionKind, SkipFlags, ValidationError},
    source::ResolvedSource,
};

const DEFAULT_DEBUGLOG: &str = "/var/log/system-upgrade.log";

const REPO_FLAGS: [(&str, RepoActionKind); 3] = [
    ("enablerepo", RepoActionKind::Enable),
    ("disablerepo", RepoActionKind::Disable),
    ("addrepo", RepoActionKind::Add),
];

pub fn command() -> Command {
    Command::new("system-upgrade")
        .about("Prepare the system for an offline upgrade to a new release")
        .override_usage("system-upgrade <SOURCE> [options]")
        .next_help_heading("Sources")
        .arg(
            Arg::new("device")
                .help("look for upgrade packages on the install media at DEV (default: auto)")
                .long("device")
                .value_name("DEV")
                .num_args(0..=1)
                .default_missing_value("auto"),
        )
        .arg(
            Arg::new("iso")
                .help("loop-mount an install image and upgrade from it")
                .long("iso")
                .value_name("ISO"),
        )
        .arg(
            Arg::new("network")
                .help("download packages for the given release VERSION, or 'rawhide'")
                .long("network")
                .value_name("VERSION"),
        )
        .next_help_heading("Upgrade options")
        .arg(
            Arg::new("product")
                .help("the product to upgrade to: workstation, server, cloud, or nonproduct")
                .long("product")
                .value_name("PRODUCTNAME"),
        )
        .arg(
            Arg::new("enablerepo")
                .help("enable one or more repos (wildcards allowed)")
                .long("enablerepo")
                .value_name("REPOID")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("disablerepo")
                .help("disable one or more repos (wildcards allowed)")
                .long("disablerepo")
                .value_name("REPOID")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("addrepo")
                .help("add the repo at URL (@URL for mirrorlist)")
                .long("addrepo")
                .value_name("REPOID=[@]URL")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("instrepo")
                .help("get upgrader boot images from the repo with this id or URL")
                .long("instrepo")
                .value_name("[@]URL"),
        )
        .arg(
            Arg::new("instrepokey")
                .help("the GPG key used to check the boot images")
                .long("instrepokey")
                .value_name("GPGKEY"),
        )
        .arg(Arg::new("reboot").help("reboot after preparing the upgrade").long("reboot").action(ArgAction::SetTrue))
        .next_help_heading("Cleanup")
        .arg(
            Arg::new("clean")
                .help("remove every file and boot entry created by a previous run")
                .long("clean")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("resetbootloader")
                .help("only remove the boot entry created by a previous run")
                .long("resetbootloader")
                .action(ArgAction::SetTrue),
        )
        .next_help_heading("Logging")
        .arg(
            Arg::new("verbose")
                .help("print more information")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .help("print lots of debugging information")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debuglog")
                .help("write debugging output to the given file")
                .long("debuglog")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_DEBUGLOG),
        )
        .arg(Arg::new("skippkgs").long("skippkgs").hide(true).action(ArgAction::SetTrue))
        .arg(Arg::new("skipkernel").long("skipkernel").hide(true).action(ArgAction::SetTrue))
        .arg(Arg::new("skipbootloader").long("skipbootloader").hide(true).action(ArgAction::SetTrue))
}

pub fn raw_options(matches: &ArgMatches) -> RawOptions {
    let string = |id: &str| matches.get_one::<String>(id).cloned();

    let loglevel = if matches.get_flag("debug") {
        LevelFilter::Debug
    } else if matches.get_flag("verbose") {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    RawOptions {
        loglevel,
        debuglog: matches.get_one::<PathBuf>("debuglog").cloned(),
        reboot: matches.get_flag("reboot"),
        product: string("product"),
        device: string("device"),
        iso: string("iso"),
        network: string("network"),
        repos: repo_actions(matches),
        instrepo: string("instrepo"),
        instrepokey: string("instrepokey"),
        clean: matches.get_flag("clean"),
        resetbootloader: matches.get_flag("resetbootloader"),
        skip: SkipFlags {
            packages:   matches.get_flag("skippkgs"),
            kernel:     matches.get_flag("skipkernel"),
            bootloader: matches.get_flag("skipbootloader"),
        },
    }
}

/// Every repo flag, in the order they were given on the command line.
fn repo_actions(matches: &ArgMatches) -> Vec<(RepoActionKind, String)> {
    let mut actions = Vec::new();

    for &(id, kind) in &REPO_FLAGS {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            actions.extend(indices.zip(values).map(|(index, value)| (index, kind, value.clone())));
        }
    }

    actions.sort_by_key(|&(index, _, _)| index);
    actions.into_iter().map(|(_, kind, value)| (kind, value)).collect()
}

pub fn report_invalid(why: &ValidationError) {
    eprintln!("system-upgrade: {}", color_error(why));
    if let ValidationError::SourceRequired = why {
        eprintln!("{}", color_hint("see `system-upgrade --help` for the list of sources"));
    }
}

pub fn report_error(why: &(dyn std::error::Error + 'static)) {
    eprintln!("system-upgrade: {}", color_error(format_error(why)));
}

pub fn report_prepared(source: &ResolvedSource, reboot: bool) {
    let from = match source {
        ResolvedSource::Media(media) => media.dev.display().to_string(),
        ResolvedSource::Network(version) => ["release ", version].concat(),
    };

    println!("{}: upgrade from {}", color_done("prepared"), color_subject(from));
    if !reboot {
        println!("{}", color_hint("reboot to begin the upgrade"));
    }
}

pub fn report_cleaned(mode: CleanMode) {
    let what = match mode {
        CleanMode::Bootloader => "boot entry removed",
        _ => "staged upgrade removed",
    };

    println!("{}: {}", color_done("cleaned"), what);
}
