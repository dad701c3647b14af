use std::process::ExitCode;

fn main() -> ExitCode {
    let _guard = option_env!("SENTRY_DSN_BACKEND").map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                send_default_pii: false,
                ..Default::default()
            },
        ))
    });

    lbbox2yolo_lib::run()
}
