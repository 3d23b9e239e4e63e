use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};
use log::error;

use super::{RecordStore, StorageError};

type SdmmcError = embedded_sdmmc::Error<SdCardError>;

/// FAT-formatted SD card in SPI mode.
///
/// Every operation opens the volume, the root directory and the file, and
/// closes all three before returning, so a card pulled between two passes
/// never holds a half-written cluster chain. The SPI bus is blocking; a pass
/// that logs one row spends a few milliseconds here.
pub struct SdCardStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }
}

fn open_failed(operation: &'static str) -> impl FnOnce(SdmmcError) -> StorageError {
    move |e| {
        error!("SD card: failed to open {}: {:?}", operation, e);
        match e {
            embedded_sdmmc::Error::DeviceError(_) => StorageError::Unavailable,
            _ => StorageError::OpenFailed { operation },
        }
    }
}

fn write_failed(e: SdmmcError) -> StorageError {
    error!("SD card: write failed: {:?}", e);
    StorageError::WriteRejected
}

impl<S, D, T> RecordStore for SdCardStore<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn verify(&mut self) -> Result<(), StorageError> {
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(open_failed("volume 0"))?;
        let root_dir = volume0
            .open_root_dir()
            .map_err(open_failed("root directory"))?;

        root_dir.close().map_err(open_failed("root directory"))?;
        volume0.close().map_err(open_failed("volume 0"))?;
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(open_failed("volume 0"))?;
        let root_dir = volume0
            .open_root_dir()
            .map_err(open_failed("root directory"))?;

        let found = match root_dir.find_directory_entry(name) {
            Ok(_) => true,
            Err(embedded_sdmmc::Error::NotFound) => false,
            Err(e) => return Err(open_failed("directory entry")(e)),
        };

        root_dir.close().map_err(open_failed("root directory"))?;
        volume0.close().map_err(open_failed("volume 0"))?;
        Ok(found)
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(open_failed("volume 0"))?;
        let root_dir = volume0
            .open_root_dir()
            .map_err(open_failed("root directory"))?;
        let file = root_dir
            .open_file_in_dir(name, Mode::ReadWriteCreateOrAppend)
            .map_err(open_failed("log file"))?;

        file.write(bytes).map_err(write_failed)?;

        // Closing the file flushes the directory entry; a failure here means
        // the row may not be on the card.
        file.close().map_err(write_failed)?;
        root_dir.close().map_err(open_failed("root directory"))?;
        volume0.close().map_err(open_failed("volume 0"))?;

        Ok(())
    }
}
