use log::*;
use std::io::{Error, ErrorKind};

use pollbooth::config::Config;
use pollbooth::{server, store, AppState};

#[async_std::main]
async fn main() -> Result<(), std::io::Error> {
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration! {}", err);
            return Err(Error::new(ErrorKind::InvalidInput, err));
        }
    };

    match store::open(&config).await {
        Ok(store) => {
            let state = AppState::new(store).map_err(|err| Error::new(ErrorKind::Other, err))?;
            let app = server(state);
            info!("Listening on {}", config.listen_addr);
            app.listen(config.listen_addr).await?;
            Ok(())
        }
        Err(err) => {
            error!("Could not initialize the store! {:?}", err);
            Err(Error::new(ErrorKind::Other, err))
        }
    }
}
