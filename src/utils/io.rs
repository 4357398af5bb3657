use flate2::bufread::MultiGzDecoder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// A reader over annotation and reference inputs that may be gzipped.
pub(crate) enum TextReader {
    Plain(BufReader<File>),
    Zipped(MultiGzDecoder<BufReader<File>>),
}

impl Read for TextReader {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            TextReader::Plain(inner) => inner.read(buf),
            TextReader::Zipped(inner) => inner.read(buf),
        }
    }
}

/// Checks whether a file is a gzip file.
///
/// This is currently done naively by seeing if it ends with a `gz` extension.
#[inline]
pub(crate) fn is_gz<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().extension().is_some_and(|ext| ext == "gz")
}

/// Opens a plain or gzipped text file for buffered line reading.
pub(crate) fn open_text_reader<P: AsRef<Path>>(path: P) -> std::io::Result<BufReader<TextReader>> {
    let file = File::open(&path)?;
    let buf_reader = BufReader::new(file);

    let reader = if is_gz(&path) {
        TextReader::Zipped(MultiGzDecoder::new(buf_reader))
    } else {
        TextReader::Plain(buf_reader)
    };

    Ok(BufReader::new(reader))
}
