use std::io;

/// One blocking full-duplex exchange on the SPI bus.
///
/// `rx` has the same length as `tx`. Implementations must serialize physical
/// bus access themselves if several handles share a bus.
pub trait Transport {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        (**self).transfer(tx, rx)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        (**self).transfer(tx, rx)
    }
}

#[cfg(feature = "spidev")]
pub use self::spi::{SpiConfig, SpidevTransport};

#[cfg(feature = "spidev")]
mod spi {
    use super::Transport;
    use crate::constants::{SPI_TARGET_SPEED_HZ, SPIDEV_PATH};
    use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
    use std::io;
    use std::path::PathBuf;
    use tracing::info;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    /// Linux spidev settings for the BrickPi3.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct SpiConfig {
        pub path: PathBuf,
        pub speed_hz: u32,
    }

    impl Default for SpiConfig {
        fn default() -> Self {
            Self {
                path: PathBuf::from(SPIDEV_PATH),
                speed_hz: SPI_TARGET_SPEED_HZ,
            }
        }
    }

    pub struct SpidevTransport {
        spi: Spidev,
    }

    impl SpidevTransport {
        pub fn open(config: &SpiConfig) -> io::Result<Self> {
            info!("Opening {} at {} Hz", config.path.display(), config.speed_hz);
            let mut spi = Spidev::open(&config.path)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(config.speed_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)?;
            Ok(Self { spi })
        }
    }

    impl Transport for SpidevTransport {
        fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
            let mut transfer = SpidevTransfer::read_write(tx, rx);
            self.spi.transfer(&mut transfer)
        }
    }
}
