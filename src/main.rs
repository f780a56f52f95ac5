use std::error::Error;
use std::sync::Arc;

use log::{info, warn};
use structopt::StructOpt;

use md2txt::Args;
use md2txt::{build_app, Listing, State, TimestampSource};

#[async_std::main]
async fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let args = Args::from_args();

    let store = Arc::new(args.open_store()?);
    let credentials = args.admin_credentials();
    if !credentials.is_enabled() {
        warn!("No admin password set, the admin pages will refuse every login");
    }

    let history = Listing::load(store.as_ref()).await?;
    info!("Loaded {} recorded conversions", history.total);
    let newest = history.records.first().map(|record| record.timestamp.as_str());
    let clock = TimestampSource::after(newest);

    let app = build_app(State::with_clock(store.clone(), credentials, clock));

    let addr = args.addr();
    println!(
        "Listening on {}\nYou can change the port with the PORT env var",
        addr
    );
    let served = app.listen(addr).await;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close()?,
        Err(_) => warn!("Record store still in use, leaving it to close on exit"),
    }
    info!("Shut down");

    Ok(served?)
}
