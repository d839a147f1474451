// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mediatype::{MediaType, MediaTypeList, Name, ReadParams, names};

/// Whether the client's `Accept` headers prefer `text/html` strictly over
/// `application/json`. A tie (including `*/*` matching both at the same
/// quality) goes to JSON, so browsers get the console but API clients never
/// lose JSON by accident.
pub fn prefers_html(accept_headers: &[String]) -> bool {
    let mut html_quality = 0.0f32;
    let mut json_quality = 0.0f32;

    for header in accept_headers {
        for media in MediaTypeList::new(header).flatten() {
            let quality = quality(&media);
            if matches(&media, names::TEXT, names::HTML) {
                html_quality = html_quality.max(quality);
            }
            if matches(&media, names::APPLICATION, names::JSON) {
                json_quality = json_quality.max(quality);
            }
        }
    }

    html_quality > json_quality
}

fn matches(media: &MediaType, ty: Name, subty: Name) -> bool {
    (media.ty == ty || media.ty == names::_STAR)
        && (media.subty == subty || media.subty == names::_STAR)
}

fn quality(media: &MediaType) -> f32 {
    Name::new("q")
        .and_then(|name| media.get_param(name))
        .and_then(|value| value.to_string().parse::<f32>().ok())
        .unwrap_or(1.0)
}
