//! Compressed PDF stream inflation using lopdf.

use lopdf::{Document, Object};
use tracing::{debug, trace};

/// Decompressed content of every filtered stream in the document.
///
/// Returns nothing when the bytes do not load as a PDF. Streams without a
/// filter are skipped since their bytes are already visible in the raw buffer.
pub(crate) fn inflate_streams(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Stream inflation skipped, not a loadable PDF: {}", e);
            return Vec::new();
        }
    };

    let mut streams = Vec::new();

    for (id, object) in doc.objects.iter() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if stream.dict.get(b"Filter").is_err() {
            continue;
        }

        match stream.decompressed_content() {
            Ok(content) if !content.is_empty() => {
                trace!("Inflated stream {:?}: {} bytes", id, content.len());
                streams.push(content);
            }
            Ok(_) => {}
            Err(e) => trace!("Stream {:?} left as is: {}", id, e),
        }
    }

    debug!("Inflated {} streams", streams.len());
    streams
}
