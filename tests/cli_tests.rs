use clap::Parser;
use karatos_ci::cli::{Cli, Commands};
use karatos_ci::core::{BuildType, Target};
use karatos_ci::docker::DockerCommand;
use std::path::PathBuf;

#[test]
fn test_bare_invocation_runs_default_pipeline() {
    let cli = Cli::try_parse_from(["karatos-ci"]).unwrap();

    assert!(cli.command.is_none());
    assert_eq!(cli.run.targets, vec![Target::Arm, Target::Riscv]);
    assert_eq!(cli.run.build_type, BuildType::Debug);
    assert!(!cli.run.parallel);
    assert!(!cli.run.report);
    assert_eq!(cli.run.workspace, PathBuf::from("."));
}

#[test]
fn test_pipeline_flags_parse_at_top_level() {
    let cli = Cli::try_parse_from(["karatos-ci", "--parallel", "--report"]).unwrap();

    assert!(cli.command.is_none());
    assert!(cli.run.parallel);
    assert!(cli.run.report);

    let options = cli.run.pipeline_options();
    assert_eq!(options.targets, Target::ALL.to_vec());
    assert!(options.parallel);
    assert!(options.report);
}

#[test]
fn test_target_and_build_type_selection() {
    let cli = Cli::try_parse_from([
        "karatos-ci",
        "--targets",
        "riscv",
        "--build-type",
        "release",
        "--workspace",
        "/srv/karatos",
    ])
    .unwrap();

    assert_eq!(cli.run.targets, vec![Target::Riscv]);
    assert_eq!(cli.run.build_type, BuildType::Release);
    assert_eq!(cli.run.workspace, PathBuf::from("/srv/karatos"));
}

#[test]
fn test_unknown_target_is_rejected() {
    assert!(Cli::try_parse_from(["karatos-ci", "--targets", "x86"]).is_err());
}

#[test]
fn test_docker_subcommand_shares_workspace_flag() {
    let cli = Cli::try_parse_from(["karatos-ci", "docker", "--workspace", "/srv/karatos", "dev-arm"]).unwrap();

    match cli.command {
        Some(Commands::Docker { command }) => assert_eq!(command, DockerCommand::DevArm),
        other => panic!("expected docker subcommand, got {:?}", other),
    }
    assert_eq!(cli.run.workspace, PathBuf::from("/srv/karatos"));

    let cli = Cli::try_parse_from(["karatos-ci", "--workspace", "/srv/karatos", "docker", "status"]).unwrap();
    assert_eq!(cli.run.workspace, PathBuf::from("/srv/karatos"));
}
