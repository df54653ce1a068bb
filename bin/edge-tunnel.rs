// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

use edge_tunnel::config::AppConfig;
use edge_tunnel::http::build_router;
use log::LevelFilter;

fn main() {
    unsafe { simple_logger::init().unwrap_unchecked() };
    log::set_max_level(LevelFilter::Info);

    log::info!("edge-tunnel v0.1.0. license under MPL-2.0.");

    if let Err(e) = run() {
        log::error!("exited unexpectedly: {}", e);
    }
}

fn run() -> io::Result<()> {
    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    log::set_max_level(config.log_level);

    let bind_addr = config.bind_addr;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let router = build_router(config);
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        log::info!("listening on {bind_addr}");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                log::info!("SIGINT received, exiting...");
            })
            .await
    })
}
