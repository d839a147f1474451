// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde_json::Value;

use core_engine::Uploads;

/// One `.`-separated step of an upload path. A numeric segment indexes an
/// array; applied to an object it is used as the (string) key.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FileMapError {
    #[error("no uploaded file for field \"{0}\"")]
    UnknownField(String),

    #[error("path \"{0}\" does not address a value in the operations")]
    MissingTarget(String),

    #[error("path \"{0}\" traverses a value that is neither an object nor a list")]
    NotAContainer(String),

    #[error("path \"{0}\" uses a non-numeric segment to index a list")]
    NonNumericIndex(String),
}

enum InjectError {
    MissingTarget,
    NotAContainer,
    NonNumericIndex,
}

impl InjectError {
    fn at(self, path: &str) -> FileMapError {
        match self {
            InjectError::MissingTarget => FileMapError::MissingTarget(path.to_string()),
            InjectError::NotAContainer => FileMapError::NotAContainer(path.to_string()),
            InjectError::NonNumericIndex => FileMapError::NonNumericIndex(path.to_string()),
        }
    }
}

/// Rewrites `operations` so that every path in `file_map` holds the upload
/// token of the mapped file (the GraphQL multipart request convention's
/// `operations`/`map` pair).
///
/// The input tree is never mutated; each replacement builds a new tree, so
/// the order of `file_map` entries is immaterial.
pub fn place_files_in_operations(
    operations: &Value,
    file_map: &IndexMap<String, Vec<String>>,
    uploads: &Uploads,
) -> Result<Value, FileMapError> {
    let mut output = operations.clone();

    for (field_name, paths) in file_map {
        let file = uploads
            .get(field_name)
            .ok_or_else(|| FileMapError::UnknownField(field_name.clone()))?;
        let token = file.placeholder();

        for path in paths {
            output = add_file_to_operations(&output, &parse_path(path), &token)
                .map_err(|error| error.at(path))?;
        }
    }

    Ok(output)
}

fn parse_path(path: &str) -> Vec<Segment> {
    path.split('.')
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => Segment::Index(index),
            Err(_) => Segment::Key(segment.to_string()),
        })
        .collect()
}

fn add_file_to_operations(
    tree: &Value,
    path: &[Segment],
    leaf: &Value,
) -> Result<Value, InjectError> {
    let Some((segment, rest)) = path.split_first() else {
        return Ok(leaf.clone());
    };

    match (tree, segment) {
        (Value::Object(map), segment) => {
            let key = match segment {
                Segment::Key(key) => key.clone(),
                Segment::Index(index) => index.to_string(),
            };
            let child = map.get(&key).ok_or(InjectError::MissingTarget)?;
            let replaced = add_file_to_operations(child, rest, leaf)?;

            let mut map = map.clone();
            map.insert(key, replaced);
            Ok(Value::Object(map))
        }
        (Value::Array(items), Segment::Index(index)) => {
            let child = items.get(*index).ok_or(InjectError::MissingTarget)?;
            let replaced = add_file_to_operations(child, rest, leaf)?;

            let mut items = items.clone();
            items[*index] = replaced;
            Ok(Value::Array(items))
        }
        (Value::Array(_), Segment::Key(_)) => Err(InjectError::NonNumericIndex),
        _ => Err(InjectError::NotAContainer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use core_engine::UploadFile;
    use serde_json::json;

    fn uploads(field_names: &[&str]) -> Uploads {
        let mut uploads = Uploads::default();
        for field_name in field_names {
            uploads.insert(UploadFile {
                field_name: field_name.to_string(),
                file_name: Some(format!("{field_name}.txt")),
                content_type: Some("text/plain".to_string()),
                content: Bytes::from_static(b"contents"),
            });
        }
        uploads
    }

    fn file_map(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(field, paths)| {
                (
                    field.to_string(),
                    paths.iter().map(|path| path.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn injects_token_at_mapped_path() {
        let uploads = uploads(&["file"]);
        let operations = json!({
            "query": "mutation($file: Upload!) { upload(file: $file) }",
            "variables": {"file": null}
        });

        let rewritten = place_files_in_operations(
            &operations,
            &file_map(&[("file", &["variables.file"])]),
            &uploads,
        )
        .unwrap();

        let injected = &rewritten["variables"]["file"];
        assert_eq!(uploads.resolve(injected).unwrap().field_name, "file");
        // the input tree is untouched
        assert_eq!(operations["variables"]["file"], Value::Null);
    }

    #[test]
    fn numeric_segments_index_lists() {
        let uploads = uploads(&["a", "b"]);
        let operations = json!({"variables": {"files": [null, null]}});

        let rewritten = place_files_in_operations(
            &operations,
            &file_map(&[("a", &["variables.files.0"]), ("b", &["variables.files.1"])]),
            &uploads,
        )
        .unwrap();

        let files = rewritten["variables"]["files"].as_array().unwrap();
        assert_eq!(uploads.resolve(&files[0]).unwrap().field_name, "a");
        assert_eq!(uploads.resolve(&files[1]).unwrap().field_name, "b");
    }

    #[test]
    fn one_file_may_fill_many_paths() {
        let uploads = uploads(&["file"]);
        let operations = json!({"variables": {"one": null, "two": null}});

        let rewritten = place_files_in_operations(
            &operations,
            &file_map(&[("file", &["variables.one", "variables.two"])]),
            &uploads,
        )
        .unwrap();

        assert_eq!(
            rewritten["variables"]["one"],
            rewritten["variables"]["two"]
        );
    }

    #[test]
    fn bad_paths_are_rejected() {
        let uploads = uploads(&["file"]);
        let operations = json!({"variables": {"file": null, "list": [null]}});

        assert_eq!(
            place_files_in_operations(
                &operations,
                &file_map(&[("file", &["variables.missing"])]),
                &uploads,
            ),
            Err(FileMapError::MissingTarget("variables.missing".to_string()))
        );

        assert_eq!(
            place_files_in_operations(
                &operations,
                &file_map(&[("file", &["variables.list.first"])]),
                &uploads,
            ),
            Err(FileMapError::NonNumericIndex(
                "variables.list.first".to_string()
            ))
        );

        assert_eq!(
            place_files_in_operations(
                &operations,
                &file_map(&[("file", &["variables.file.inner"])]),
                &uploads,
            ),
            Err(FileMapError::NotAContainer(
                "variables.file.inner".to_string()
            ))
        );

        assert_eq!(
            place_files_in_operations(
                &operations,
                &file_map(&[("other", &["variables.file"])]),
                &uploads,
            ),
            Err(FileMapError::UnknownField("other".to_string()))
        );
    }
}
