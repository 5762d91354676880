mod license;
mod network;
mod paths;
mod updater;

pub use license::LicenseSettings;
pub use network::NetworkSettings;
pub use paths::PathSettings;
pub use updater::UpdaterSettings;
