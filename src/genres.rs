//! Genre lookup table and movie/genre association rows.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;

use crate::{
    normalize::parse_sequence,
    records::{Genre, MovieGenre, MovieRecord},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreTables {
    pub genres: Vec<Genre>,
    pub links: Vec<MovieGenre>,
}

impl GenreTables {
    /// Ids are assigned 1..N in ascending name order, so they are stable for
    /// a given set of movies. Loading into a store that already holds genres
    /// remaps them to the stored ids by name (see `store::insert_genres`).
    pub fn build(movies: &[MovieRecord]) -> Self {
        let per_movie: Vec<(&str, Vec<String>)> = movies
            .iter()
            .map(|movie| (movie.movie_id.as_str(), genre_names(&movie.genres)))
            .collect();

        let names: BTreeSet<&str> = per_movie
            .iter()
            .flat_map(|(_, names)| names.iter().map(String::as_str))
            .collect();
        let genres: Vec<Genre> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| Genre {
                genre_id: idx as i64 + 1,
                genre_name: (*name).to_string(),
            })
            .collect();
        let ids: HashMap<&str, i64> = genres
            .iter()
            .map(|g| (g.genre_name.as_str(), g.genre_id))
            .collect();

        let mut links = Vec::new();
        for (movie_id, names) in &per_movie {
            for name in names {
                if let Some(genre_id) = ids.get(name.as_str()) {
                    links.push(MovieGenre {
                        movie_id: (*movie_id).to_string(),
                        genre_id: *genre_id,
                    });
                }
            }
        }
        Self { genres, links }
    }
}

/// Distinct names in first-seen order. Entries that are still a flattened
/// sequence (`"['Action', 'Drama']"`) are decoded first.
fn genre_names(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| {
            let trimmed = value.trim();
            if trimmed.starts_with('[') {
                parse_sequence(trimmed)
            } else {
                vec![trimmed.to_string()]
            }
        })
        .filter(|name| !name.is_empty())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: &str, genres: &[&str]) -> MovieRecord {
        MovieRecord {
            movie_id: id.to_string(),
            title: id.to_string(),
            normalized_title: id.to_string(),
            release_date: None,
            year: 2000,
            decade: "2000–2009".to_string(),
            certificate: None,
            rating: None,
            votes: None,
            runtime: None,
            description: None,
            production_countries: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn encoded_list_yields_one_link_per_genre() {
        let tables = GenreTables::build(&[movie("tt1", &[r#"["Action", "Sci-Fi"]"#])]);
        assert_eq!(tables.genres.len(), 2);
        assert_eq!(tables.links.len(), 2);
        assert_eq!(tables.genres[0].genre_name, "Action");
        assert_eq!(tables.genres[1].genre_id, 2);
    }

    #[test]
    fn ids_follow_alphabetical_order_across_movies() {
        let tables = GenreTables::build(&[
            movie("tt1", &["Western", "Drama"]),
            movie("tt2", &["Comedy", "Drama", "Drama"]),
            movie("tt3", &[]),
        ]);
        let names: Vec<_> = tables.genres.iter().map(|g| g.genre_name.as_str()).collect();
        assert_eq!(names, vec!["Comedy", "Drama", "Western"]);
        assert_eq!(tables.links.len(), 4);
        assert!(tables.links.iter().all(|l| l.movie_id != "tt3"));
        assert!(tables.links.contains(&MovieGenre {
            movie_id: "tt1".into(),
            genre_id: 3
        }));
    }
}
