use bt_vendor_mrvl::domain::settings::VendorSettings;
use bt_vendor_mrvl::infrastructure::device::MbtcharDevice;
use bt_vendor_mrvl::infrastructure::logging::init_logger;
use bt_vendor_mrvl::infrastructure::transport::{SerialTransport, TransportConfig};
use std::path::PathBuf;
use tracing::info;

/// Open and close the controller device node with the configured retry
/// policy. Usage: `mrvl_probe [settings.json]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = VendorSettings::load_or_default(settings_path.as_deref());
    let _guard = init_logger(&settings.log_settings)?;

    info!("Probing {}", settings.device_path);
    let transport = SerialTransport::new(MbtcharDevice, TransportConfig::from(&settings));

    let handle = transport.open().await?;
    info!("Device open (fd {})", handle.raw());

    transport.close().await?;
    info!("Device released and closed");
    Ok(())
}
