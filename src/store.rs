use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    Set, TransactionTrait,
    sea_query::{Expr, Func, LikeExpr},
};
use tracing::debug;

use crate::{
    entities::movie,
    error::{AppError, AppResult},
    models::NewMovie,
};

#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_all(&self) -> AppResult<Vec<movie::Model>> {
        let movies = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        debug!(count = movies.len(), "listed movies");
        Ok(movies)
    }

    pub async fn get(&self, id: i32) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound(id))
    }

    pub async fn insert(&self, fields: NewMovie) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;

        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(fields.title),
            running_time: Set(fields.running_time),
            language: Set(fields.language),
            genre: Set(fields.genre),
            release_date: Set(fields.release_date),
            cast_detail: Set(fields.cast_detail),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        debug!(id = model.id, title = %model.title, "inserted movie");
        Ok(model)
    }

    /// Overwrites every mutable column of an existing record.
    pub async fn update(&self, id: i32, fields: NewMovie) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;

        let Some(existing) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::NotFound(id));
        };

        let mut active = existing.into_active_model();
        active.title = Set(fields.title);
        active.running_time = Set(fields.running_time);
        active.language = Set(fields.language);
        active.genre = Set(fields.genre);
        active.release_date = Set(fields.release_date);
        active.cast_detail = Set(fields.cast_detail);

        let model = active.update(&txn).await?;
        txn.commit().await?;

        debug!(id, "updated movie");
        Ok(model)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let res = movie::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(id));
        }

        txn.commit().await?;

        debug!(id, "deleted movie");
        Ok(())
    }

    /// Case-insensitive substring match on title, with Unicode case folding.
    /// `%`, `_` and `\` in `text` match literally.
    ///
    /// SQLite's `LOWER` only folds ASCII, so the database narrows candidates with
    /// a pattern that only constrains the ASCII parts of `text`, and the exact
    /// match is decided here.
    pub async fn find_by_title(&self, text: &str) -> AppResult<Vec<movie::Model>> {
        let needle = text.to_lowercase();

        let candidates = movie::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col((movie::Entity, movie::Column::Title))))
                    .like(LikeExpr::new(ascii_like_pattern(&needle)).escape('\\')),
            )
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;

        let movies: Vec<_> =
            candidates.into_iter().filter(|m| m.title.to_lowercase().contains(&needle)).collect();

        debug!(text, matches = movies.len(), "searched movies by title");
        Ok(movies)
    }
}

/// `LIKE` pattern matching any title that contains `needle`. ASCII characters
/// are kept (wildcards escaped) and each run of non-ASCII characters becomes `%`.
fn ascii_like_pattern(needle: &str) -> String {
    let mut pattern = String::from("%");
    let mut open = true;
    for c in needle.chars() {
        if c.is_ascii() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c.to_ascii_lowercase());
            open = false;
        } else if !open {
            pattern.push('%');
            open = true;
        }
    }
    if !open {
        pattern.push('%');
    }
    pattern
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::connect_in_memory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            running_time: 120,
            language: "English".to_string(),
            genre: "Drama".to_string(),
            release_date: date(2001, 1, 1),
            cast_detail: "Someone, Someone Else".to_string(),
        }
    }

    async fn store() -> MovieStore {
        MovieStore::new(connect_in_memory().await)
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        let store = store().await;
        let a = store.insert(new_movie("Alien")).await.unwrap();
        let b = store.insert(new_movie("Aliens")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "Alien");
        assert_eq!(a.release_date, date(2001, 1, 1));
        assert_eq!(store.get(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn list_all_is_ordered_by_id() {
        let store = store().await;
        for title in ["Heat", "Ronin", "Collateral"] {
            store.insert(new_movie(title)).await.unwrap();
        }

        let titles: Vec<_> =
            store.list_all().await.unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, ["Heat", "Ronin", "Collateral"]);
    }

    #[tokio::test]
    async fn update_overwrites_all_fields() {
        let store = store().await;
        let created = store.insert(new_movie("Solaris")).await.unwrap();

        let replacement = NewMovie {
            title: "Solaris (1972)".to_string(),
            running_time: 167,
            language: "Russian".to_string(),
            genre: "Sci-Fi".to_string(),
            release_date: date(1972, 3, 20),
            cast_detail: "Natalya Bondarchuk".to_string(),
        };
        let updated = store.update(created.id, replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.running_time, 167);
        assert_eq!(updated.release_date, date(1972, 3, 20));
        assert_eq!(store.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = store().await;

        assert!(matches!(store.get(999_999).await, Err(AppError::NotFound(999_999))));
        assert!(matches!(
            store.update(999_999, new_movie("Ghost")).await,
            Err(AppError::NotFound(999_999))
        ));
        assert!(matches!(store.delete(999_999).await, Err(AppError::NotFound(999_999))));
    }

    #[tokio::test]
    async fn delete_removes_permanently() {
        let store = store().await;
        let created = store.insert(new_movie("Brazil")).await.unwrap();

        store.delete(created.id).await.unwrap();

        assert!(matches!(store.get(created.id).await, Err(AppError::NotFound(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_title_is_case_insensitive_substring() {
        let store = store().await;
        store.insert(new_movie("Inception")).await.unwrap();
        store.insert(new_movie("The Matrix")).await.unwrap();

        let hits = store.find_by_title("in").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Inception");

        assert_eq!(store.find_by_title("MATRIX").await.unwrap().len(), 1);
        assert!(store.find_by_title("xyz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_title_treats_wildcards_literally() {
        let store = store().await;
        store.insert(new_movie("100% Wolf")).await.unwrap();
        store.insert(new_movie("1000 Wolves")).await.unwrap();

        let hits = store.find_by_title("0%").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Wolf");

        assert!(store.find_by_title("_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_title_folds_non_ascii_case() {
        let store = store().await;
        store.insert(new_movie("Élite Squad")).await.unwrap();
        store.insert(new_movie("Amélie")).await.unwrap();

        for text in ["Élite", "élite", "ÉLITE SQUAD"] {
            let hits = store.find_by_title(text).await.unwrap();
            assert_eq!(hits.len(), 1, "searching {text}");
            assert_eq!(hits[0].title, "Élite Squad");
        }

        let hits = store.find_by_title("AMÉLIE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Amélie");

        // accents are not folded away
        assert!(store.find_by_title("elite").await.unwrap().is_empty());
    }

    #[test]
    fn like_pattern_escapes_wildcards_and_widens_non_ascii() {
        assert_eq!(ascii_like_pattern(r"50%_off\"), r"%50\%\_off\\%");
        assert_eq!(ascii_like_pattern("plain"), "%plain%");
        assert_eq!(ascii_like_pattern("amélie"), "%am%lie%");
        assert_eq!(ascii_like_pattern("ééé"), "%");
    }
}
