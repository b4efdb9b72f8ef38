use serde::Deserialize;

/// `data-native-document-config` of a document (carousel) post.
#[derive(Deserialize, Debug)]
pub struct DocumentConfig {
    pub doc: Option<DocumentRef>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub manifest_url: Option<String>,
    pub url: Option<String>,
}

impl DocumentRef {
    pub fn manifest(&self) -> Option<&str> {
        self.manifest_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub transcribed_document_url: Option<String>,
    pub original_url: Option<String>,
}

impl Manifest {
    /// The transcribed PDF renders everywhere; the original upload may be a pptx.
    pub fn document_url(self) -> Option<String> {
        self.transcribed_document_url
            .or(self.original_url)
            .filter(|u| u.starts_with("http"))
    }
}
