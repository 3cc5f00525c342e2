use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// True when some bytes could not be mapped and were replaced.
    pub lossy: bool,
}

/// Decode raw document bytes into UTF-8 using: BOM -> strict UTF-8 -> chardetng guess.
///
/// Never fails; undecodable sequences become U+FFFD and `lossy` is set.
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding_label: UTF_8.name().to_string(),
            lossy: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    decode_with(bytes, encoding)
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedText {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: encoding.name().to_string(),
        lossy: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8_passes_through() {
        let decoded = decode_text("标题: 你好".as_bytes());
        assert_eq!(decoded.text, "标题: 你好");
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert!(!decoded.lossy);
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("hello".as_bytes());
        assert_eq!(decode_text(&bytes).text, "hello");
    }

    #[test]
    fn gbk_bytes_are_detected() {
        let text = "这是一篇关于机器学习算法的中文文章，我们讨论了梯度下降和神经网络的基本原理。".repeat(4);
        let (bytes, _, _) = encoding_rs::GBK.encode(&text);
        let decoded = decode_text(&bytes);
        assert!(decoded.text.contains("机器学习"));
        assert_ne!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn utf16_bom_is_honored() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_text(&bytes);
        assert_eq!(decoded.text, "hi");
        assert_eq!(decoded.encoding_label, "UTF-16LE");
    }
}
