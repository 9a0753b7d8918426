//! Reading real PDF files on the host side.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lopdf::{Document, Object};
use pdf_bridge::{DocumentDescriptor, DocumentMetadata};
use pdf_view_sync::{DocumentLoader, LoadError};
use std::path::Path;
use std::time::UNIX_EPOCH;

async fn parse_pdf(path: &Path) -> std::result::Result<Document, LoadError> {
    let bytes = tokio::fs::read(path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes))
        .await?
        .map_err(|e| LoadError::Rejected(e.to_string()))?;
    Ok(doc)
}

/// Build the descriptor the host sends with `DocumentLoaded`
pub async fn describe(path: impl AsRef<Path>) -> Result<DocumentDescriptor> {
    let path = path.as_ref();
    let stat = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot stat {}", path.display()))?;
    let doc = parse_pdf(path)
        .await
        .with_context(|| format!("Cannot parse {}", path.display()))?;

    let mut descriptor = DocumentDescriptor::new(path, doc.get_pages().len() as u32);
    descriptor.file_size = stat.len();
    descriptor.last_modified = stat
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    descriptor.metadata = read_info(&doc);
    Ok(descriptor)
}

/// The Info dictionary, if the document has one with any text entries
fn read_info(doc: &Document) -> Option<DocumentMetadata> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        direct => direct,
    };
    let dict = info.as_dict().ok()?;
    let field = |key: &[u8]| dict.get(key).ok().and_then(text_string);

    let metadata = DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        keywords: field(b"Keywords"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
    };
    (metadata != DocumentMetadata::default()).then_some(metadata)
}

/// PDF text strings are UTF-16BE with a byte order mark, or single-byte otherwise
fn text_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };

    let text = match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    };
    Some(text)
}

/// Accepts a document only if lopdf can parse it and it has at least one page
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfLoader;

#[async_trait]
impl DocumentLoader for LopdfLoader {
    async fn load_document(&self, path: &Path) -> std::result::Result<(), LoadError> {
        if !tokio::fs::try_exists(path).await? {
            return Err(LoadError::NotFound(path.to_owned()));
        }

        let doc = parse_pdf(path).await?;
        let pages = doc.get_pages().len();
        if pages == 0 {
            return Err(LoadError::Rejected("Document has no pages".to_string()));
        }

        log::info!("Loaded {} ({} pages)", path.display(), pages);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream, StringFormat};
    use tempfile::NamedTempFile;

    pub fn create_test_pdf(num_pages: usize, title: Option<&str>) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..num_pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(num_pages as i64)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = title {
            let info_id = doc.add_object(Dictionary::from_iter(vec![(
                "Title",
                Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
            )]));
            doc.trailer.set("Info", info_id);
        }

        doc
    }

    pub fn write_test_pdf(num_pages: usize, title: Option<&str>) -> NamedTempFile {
        let mut doc = create_test_pdf(num_pages, title);
        let temp = NamedTempFile::new().unwrap();
        let mut writer = Vec::new();
        doc.save_to(&mut writer).unwrap();
        std::fs::write(temp.path(), writer).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_describe_reads_pages_and_title() {
        let temp = write_test_pdf(3, Some("Field Guide"));

        let descriptor = describe(temp.path()).await.unwrap();
        assert_eq!(descriptor.total_pages, 3);
        assert!(descriptor.file_size > 0);
        assert!(descriptor.last_modified > 0.0);
        assert_eq!(
            descriptor.metadata.and_then(|m| m.title).as_deref(),
            Some("Field Guide")
        );
    }

    #[tokio::test]
    async fn test_describe_without_info() {
        let temp = write_test_pdf(1, None);
        let descriptor = describe(temp.path()).await.unwrap();
        assert!(descriptor.metadata.is_none());
    }

    #[tokio::test]
    async fn test_loader_rejects_garbage_and_missing_files() {
        let temp = NamedTempFile::new().unwrap();
        tokio::fs::write(temp.path(), b"definitely not a pdf")
            .await
            .unwrap();
        assert!(matches!(
            LopdfLoader.load_document(temp.path()).await,
            Err(LoadError::Rejected(_))
        ));

        let missing = temp.path().with_extension("missing.pdf");
        assert!(matches!(
            LopdfLoader.load_document(&missing).await,
            Err(LoadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_loader_accepts_real_pdf() {
        let temp = write_test_pdf(2, None);
        assert!(LopdfLoader.load_document(temp.path()).await.is_ok());
    }

    #[test]
    fn test_utf16_text_strings() {
        let bytes = vec![0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(
            text_string(&Object::String(bytes, StringFormat::Hexadecimal)).as_deref(),
            Some("Hi")
        );
        assert_eq!(text_string(&Object::Integer(4)), None);
    }
}
