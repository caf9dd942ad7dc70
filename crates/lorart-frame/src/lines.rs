use bytes::BytesMut;

/// Incremental splitter from raw byte chunks to trimmed logical lines.
///
/// Keeps the bytes after the last `\n` as a residual across calls, so the
/// emitted line sequence is identical for every segmentation of the same
/// byte stream. Trimming strips `\r` and surrounding whitespace; empty
/// lines are dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    residual: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every complete line it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.residual.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.residual.iter().position(|&b| b == b'\n') {
            let segment = self.residual.split_to(pos + 1);
            // Non-UTF-8 noise from the module is replaced, not fatal.
            let text = String::from_utf8_lossy(&segment);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }

    /// Discard any buffered partial line.
    pub fn reset(&mut self) {
        self.residual.clear();
    }
}
