use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("amiga {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: amiga");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("AMIGA_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "ports: request={} feedback={} stream={} config={}",
        amiga::transport::DEFAULT_REQUEST_PORT,
        amiga::transport::DEFAULT_FEEDBACK_PORT,
        amiga::transport::DEFAULT_STREAM_PORT,
        amiga::transport::DEFAULT_CONFIG_PORT
    );

    Ok(SUCCESS)
}
