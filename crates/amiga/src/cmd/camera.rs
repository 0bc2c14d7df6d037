use amiga::CameraSettings;
use tracing::info;

use crate::cmd::{CameraArgs, Context};
use crate::exit::{amiga_error, CliResult, SUCCESS};
use crate::output::{print_record, AckOutput};

pub async fn run(args: CameraArgs, ctx: &Context) -> CliResult<i32> {
    let settings = settings_from_args(args);
    // Rejects bad settings before any connection is made.
    settings
        .parameters()
        .map_err(|err| amiga_error("invalid camera settings", err))?;

    let client = ctx.client();
    info!(camera = %settings.camera_name, "updating camera settings");
    let result = client.update_camera_settings(&settings).await;
    client.close().await;
    result.map_err(|err| amiga_error("camera update failed", err))?;

    print_record(
        &AckOutput {
            command: "camera",
            target: settings.camera_name,
            ok: true,
        },
        ctx.format,
    );
    Ok(SUCCESS)
}

fn settings_from_args(args: CameraArgs) -> CameraSettings {
    CameraSettings {
        camera_name: args.camera,
        enable_auto_exposure: args.auto_exposure,
        enable_auto_focus: args.auto_focus,
        enable_auto_white_balance: args.auto_white_balance,
        exposure_time_us: args.exposure_time_us,
        iso_sensitivity: args.iso_sensitivity,
        color_temperature_kelvins: args.color_temperature_kelvins,
        lens_position: args.lens_position,
    }
}
