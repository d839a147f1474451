// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::Value;

const UPLOAD_TOKEN_PREFIX: &str = "__quill_upload__:";

/// A file received as one part of a multipart request. The content is
/// buffered for the lifetime of the request and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl UploadFile {
    /// The JSON value injected into the operations tree in place of this
    /// file. A `serde_json::Value` cannot hold the file itself, so the tree
    /// carries a token that the engine resolves through [`Uploads`].
    pub fn placeholder(&self) -> Value {
        Value::String(format!("{UPLOAD_TOKEN_PREFIX}{}", self.field_name))
    }
}

/// The files of one request, keyed by multipart field name in arrival order.
#[derive(Debug, Default)]
pub struct Uploads {
    files: IndexMap<String, UploadFile>,
}

impl Uploads {
    pub fn insert(&mut self, file: UploadFile) {
        self.files.insert(file.field_name.clone(), file);
    }

    pub fn get(&self, field_name: &str) -> Option<&UploadFile> {
        self.files.get(field_name)
    }

    /// Resolves an injected placeholder back to its file.
    pub fn resolve(&self, value: &Value) -> Option<&UploadFile> {
        value
            .as_str()
            .and_then(|s| s.strip_prefix(UPLOAD_TOKEN_PREFIX))
            .and_then(|field_name| self.files.get(field_name))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadFile> {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_round_trips_through_resolve() {
        let mut uploads = Uploads::default();
        uploads.insert(UploadFile {
            field_name: "file".to_string(),
            file_name: Some("text1.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            content: Bytes::from_static(b"contents"),
        });

        let token = uploads.get("file").unwrap().placeholder();
        let resolved = uploads.resolve(&token).unwrap();
        assert_eq!(resolved.content, Bytes::from_static(b"contents"));

        assert!(uploads.resolve(&Value::String("plain".into())).is_none());
    }
}
