use std::fs;

use tracing::info;
use vportmsg_frame::Channel;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::{print_frame, OutputFormat, Received};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let mut channel = args.port.open()?;

    channel
        .write(args.kind, &payload)
        .map_err(|err| frame_error("send failed", err))?;
    info!(kind = %args.kind, size = payload.len(), "notification sent");

    if args.wait {
        wait_for_frame(&mut channel, format)?;
    }

    channel.close();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<String> {
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return String::from_utf8(bytes).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not valid UTF-8 text: {err}", path.display()),
            )
        });
    }
    Ok(String::new())
}

fn wait_for_frame(channel: &mut Channel, format: OutputFormat) -> CliResult<()> {
    let payload = channel
        .read_frame()
        .map_err(|err| frame_error("receive failed", err))?
        .ok_or_else(|| CliError::new(FAILURE, "port closed before a reply arrived"))?;

    print_frame(
        &Received {
            sequence: 0,
            code: None,
            body: &payload,
        },
        format,
    );
    Ok(())
}
