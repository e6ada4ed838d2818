use super::*;
use crate::frame::ErrorCode;
use crate::state::test_helpers;

fn upload(title: &str, words: &[&str]) -> DictionaryFile {
    DictionaryFile {
        title: title.into(),
        description: format!("{title} words"),
        words: words.iter().map(|w| (*w).to_owned()).collect(),
    }
}

#[test]
fn slug_collapses_separators_and_accents() {
    assert_eq!(slug("Mots Français!"), "mots-francais");
    assert_eq!(slug("  ---  "), "dictionary");
    assert_eq!(slug("Big  List 2"), "big-list-2");
}

#[tokio::test]
async fn load_reads_index_and_default() {
    let library = test_helpers::test_library(&["act", "tact"]).await;
    let list = library.list().await;
    assert_eq!(list.len(), 1);
    assert!(list[0].is_default());

    let dict = library.default_dictionary().await.unwrap();
    assert!(dict.contains("tact"));
    assert_eq!(dict.title(), library.default_title().await);
}

#[tokio::test]
async fn add_then_get_and_download() {
    let library = test_helpers::test_library(&["act"]).await;
    let info = library.add(upload("Animals", &["cat", "Dog", "cat"])).await.unwrap();
    assert_eq!(info.file, "animals.json");
    assert!(library.contains("Animals").await);

    let dict = library.get("Animals").await.unwrap();
    assert_eq!(dict.words(), ["cat", "dog"]);

    let file = library.download("Animals").await.unwrap();
    assert_eq!(file.title, "Animals");
    assert_eq!(file.words, ["cat", "dog"]);
}

#[tokio::test]
async fn add_rejects_duplicates_and_empty_lists() {
    let library = test_helpers::test_library(&["act"]).await;
    library.add(upload("Animals", &["cat"])).await.unwrap();

    let err = library.add(upload("Animals", &["dog"])).await.unwrap_err();
    assert_eq!(err.error_code(), "E_DICTIONARY_TITLE_TAKEN");

    let err = library.add(upload("Empty", &[])).await.unwrap_err();
    assert_eq!(err.error_code(), "E_DICTIONARY_INVALID");
}

#[tokio::test]
async fn update_renames_file_and_index() {
    let library = test_helpers::test_library(&["act"]).await;
    library.add(upload("Animals", &["cat"])).await.unwrap();

    let info = library.update("Animals", "Pets", "house animals").await.unwrap();
    assert_eq!(info.file, "pets.json");
    assert!(!library.contains("Animals").await);
    assert!(library.get("Pets").await.unwrap().contains("cat"));
    assert_eq!(library.download("Pets").await.unwrap().description, "house animals");

    let err = library.update("Nope", "X", "").await.unwrap_err();
    assert_eq!(err.error_code(), "E_DICTIONARY_NOT_FOUND");
}

#[tokio::test]
async fn default_can_be_renamed_but_not_deleted() {
    let library = test_helpers::test_library(&["act"]).await;
    let title = library.default_title().await;

    let info = library.update(&title, "Standard", "renamed").await.unwrap();
    assert_eq!(info.file, DEFAULT_FILE);
    assert_eq!(library.default_title().await, "Standard");

    let err = library.delete("Standard").await.unwrap_err();
    assert_eq!(err.error_code(), "E_DICTIONARY_DEFAULT");
}

#[tokio::test]
async fn delete_and_reset_keep_only_default() {
    let library = test_helpers::test_library(&["act"]).await;
    library.add(upload("Animals", &["cat"])).await.unwrap();
    library.add(upload("Plants", &["fern"])).await.unwrap();

    library.delete("Animals").await.unwrap();
    assert!(matches!(library.get("Animals").await, Err(DictionaryError::NotFound(_))));

    let removed = library.reset().await.unwrap();
    assert_eq!(removed, ["Plants"]);
    assert_eq!(library.list().await.len(), 1);
}

#[tokio::test]
async fn changes_survive_a_reload() {
    let library = test_helpers::test_library(&["act"]).await;
    library.add(upload("Animals", &["cat"])).await.unwrap();

    let reloaded = DictionaryLibrary::load(library.dir.clone()).await.unwrap();
    assert!(reloaded.get("Animals").await.unwrap().contains("cat"));
}
