use shardsearch_index::{exact_token, field_token, InternalId, ShardedInvertedIndex};
use shardsearch_tokenizer::{analyzer_for_field_type, tokenize, Stopwords};
use shardsearch_types::{walk_fields, Document, FieldType, Mappings};

/// Tokenizes and indexes every field of `doc` under `internal_id`: text-like
/// fields get their analyzed tokens (§4.1/§4.3), and every field additionally
/// gets one `exact_token` entry so `term` queries can reuse the same
/// posting-list machinery (§4.5). Returns the document's indexed length —
/// the token count summed across indexed fields, which BM25 normalizes
/// against.
pub fn index_document(
    index: &mut ShardedInvertedIndex,
    mappings: &Mappings,
    stopwords: &Stopwords,
    internal_id: InternalId,
    doc: &Document,
) -> u32 {
    let mut length = 0u32;
    for (path, value) in walk_fields(doc) {
        let ty = mappings.get(&path).unwrap_or(FieldType::Text);
        if ty.is_text_like() {
            if let Some(text) = value.as_str() {
                let analyzer = analyzer_for_field_type(ty);
                for (pos, token) in tokenize(text, &analyzer, stopwords).into_iter().enumerate() {
                    index.add_token(&field_token(&path, &token), internal_id, pos as u32);
                    length += 1;
                }
            }
        }
        index.add_token(&exact_token(&path, value), internal_id, 0);
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn indexes_text_fields_and_exact_tokens() {
        let mut mappings = Mappings::new();
        let doc = json!({"id": "1", "title": "Rust Programming"}).as_object().unwrap().clone();
        mappings.auto_map(&doc);
        let mut index = ShardedInvertedIndex::new(1).unwrap();
        let stopwords = Stopwords::new();
        let length = index_document(&mut index, &mappings, &stopwords, 0, &doc);
        assert_eq!(length, 2);
        assert!(index.contains_token("title:rust"));
        assert!(index.contains_token(&exact_token("title", &json!("Rust Programming"))));
    }

    #[test]
    fn non_text_fields_only_get_exact_tokens() {
        let mut mappings = Mappings::new();
        let doc = json!({"id": "1", "price": 9.99}).as_object().unwrap().clone();
        mappings.auto_map(&doc);
        let mut index = ShardedInvertedIndex::new(1).unwrap();
        let stopwords = Stopwords::new();
        let length = index_document(&mut index, &mappings, &stopwords, 0, &doc);
        assert_eq!(length, 0);
        assert!(index.contains_token(&exact_token("price", &json!(9.99))));
    }
}
