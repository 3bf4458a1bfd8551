use tracing::{debug, info};
use vportmsg_frame::decode_payload;

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat, Received};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut channel = args.port.open()?;
    let mut printed = 0usize;

    loop {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }

        let payload = match channel
            .read_frame()
            .map_err(|err| frame_error("receive failed", err))?
        {
            Some(payload) => payload,
            None => {
                debug!("port reached end of stream");
                break;
            }
        };

        if args.replies {
            let reply = decode_payload(payload).map_err(|err| frame_error("decode failed", err))?;
            print_frame(
                &Received {
                    sequence: printed,
                    code: Some(reply.code),
                    body: &reply.body,
                },
                format,
            );
        } else {
            print_frame(
                &Received {
                    sequence: printed,
                    code: None,
                    body: &payload,
                },
                format,
            );
        }
        printed += 1;
    }

    info!(frames = printed, "listen finished");
    channel.close();
    Ok(SUCCESS)
}
