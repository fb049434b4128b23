use crate::signal::TimeSeries;
use anyhow::{anyhow, Result};
use edf_reader::file_reader::SyncFileReader;
use edf_reader::sync_reader::SyncEDFReader;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Helper implementing the EDF reader trait for on-disk files.
struct DiskFileReader {
    path: PathBuf,
}

impl DiskFileReader {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SyncFileReader for DiskFileReader {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>, std::io::Error> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A multi-channel EDF recording with each channel at its own rate.
#[derive(Debug, Clone)]
pub struct EdfRecording {
    pub channels: Vec<TimeSeries>,
}

impl EdfRecording {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Load every channel of an EDF file. Channel sampling rates are derived
/// from the samples-per-record count and the data record duration.
pub fn load_edf_recording(path: &Path) -> Result<EdfRecording> {
    let reader = SyncEDFReader::init_with_file_reader(DiskFileReader::new(path))?;
    let total_duration = reader.edf_header.block_duration * reader.edf_header.number_of_blocks;
    let data_matrix = reader.read_data_window(0, total_duration)?;
    let mut channels = Vec::with_capacity(reader.edf_header.channels.len());
    for (index, header_channel) in reader.edf_header.channels.iter().enumerate() {
        let data = data_matrix
            .get(index)
            .ok_or_else(|| anyhow!("missing data for channel {}", index))?;
        let fs = header_channel.number_of_samples_in_data_record as f64 * 1000.0
            / reader.edf_header.block_duration as f64;
        channels.push(TimeSeries {
            fs,
            data: data.iter().map(|value| *value as f64).collect(),
        });
    }
    Ok(EdfRecording { channels })
}

/// Load a single EDF channel (by index) into a `TimeSeries`.
pub fn load_edf_channel(path: &Path, channel: usize) -> Result<TimeSeries> {
    let recording = load_edf_recording(path)?;
    let count = recording.channel_count();
    recording
        .channels
        .into_iter()
        .nth(channel)
        .ok_or_else(|| {
            anyhow!(
                "EDF file has {} channels; channel {} is out of range",
                count,
                channel
            )
        })
}
