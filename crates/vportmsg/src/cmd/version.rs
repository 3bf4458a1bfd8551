use vportmsg_frame::{READ_HEADER_SIZE, WRITE_HEADER_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("vportmsg {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: vportmsg");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("VPORTMSG_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("VPORTMSG_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "backend: {}",
        if cfg!(windows) { "overlapped" } else { "posix" }
    );
    println!("read_header_size: {READ_HEADER_SIZE}");
    println!("write_header_size: {WRITE_HEADER_SIZE}");

    Ok(SUCCESS)
}
