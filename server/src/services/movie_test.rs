use super::*;

// =============================================================================
// Pagination
// =============================================================================

#[test]
fn pagination_defaults() {
    let p = Pagination::new(None, None).unwrap();
    assert_eq!(p, Pagination { page: 1, per_page: 10 });
    assert_eq!(p.offset(), 0);
}

#[test]
fn pagination_bounds() {
    assert!(matches!(Pagination::new(Some(0), None), Err(MovieError::InvalidPage)));
    assert!(matches!(Pagination::new(Some(1), Some(0)), Err(MovieError::InvalidPerPage)));
    assert!(matches!(Pagination::new(Some(1), Some(51)), Err(MovieError::InvalidPerPage)));
    assert!(Pagination::new(Some(1), Some(50)).is_ok());
}

#[test]
fn pagination_offset() {
    assert_eq!(Pagination::new(Some(3), Some(20)).unwrap().offset(), 40);
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(total_pages(0, 10), 0);
    assert_eq!(total_pages(1, 10), 1);
    assert_eq!(total_pages(10, 10), 1);
    assert_eq!(total_pages(11, 10), 2);
}

#[test]
fn page_not_found_message() {
    let err = MovieError::PageNotFound { page: 7, total_pages: 3 };
    assert_eq!(err.to_string(), "Page 7 not found. Total pages: 3");
}

// =============================================================================
// split_list / escape_like
// =============================================================================

#[test]
fn split_list_handles_pipes_and_blanks() {
    assert_eq!(split_list(Some("Action|Sci-Fi".into())), vec!["Action", "Sci-Fi"]);
    assert_eq!(split_list(Some(" Keanu Reeves | Carrie-Anne Moss |".into())), vec!["Keanu Reeves", "Carrie-Anne Moss"]);
    assert!(split_list(Some(String::new())).is_empty());
    assert!(split_list(None).is_empty());
}

#[test]
fn escape_like_escapes_wildcards() {
    assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    assert_eq!(escape_like("matrix"), "matrix");
}

// =============================================================================
// SearchFilter
// =============================================================================

#[test]
fn blank_filters_are_empty() {
    let filter = SearchFilter { title: Some("  ".into()), year: None, genre: Some(String::new()) }.normalized();
    assert!(filter.is_empty());
}

#[test]
fn year_alone_is_a_filter() {
    let filter = SearchFilter { year: Some(1999), ..SearchFilter::default() }.normalized();
    assert!(!filter.is_empty());
}

#[test]
fn filter_serializes_only_present_fields() {
    let filter = SearchFilter { title: Some("matrix".into()), ..SearchFilter::default() };
    assert_eq!(serde_json::to_value(filter).unwrap(), serde_json::json!({ "title": "matrix" }));
}

// =============================================================================
// parse_csv
// =============================================================================

const HEADER: &str = "id,title,year,genre,director,actors,plot,poster_url";

#[test]
fn parse_csv_reads_rows() {
    let body = format!(
        "{HEADER}\n1,The Matrix,1999,Action|Sci-Fi,Lana Wachowski,Keanu Reeves|Laurence Fishburne,\"A hacker, a choice.\",https://img/1.jpg\n"
    );
    let movies = parse_csv(&body).unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].title, "The Matrix");
    assert_eq!(movies[0].year, 1999);
    assert_eq!(movies[0].plot, "A hacker, a choice.");
    assert_eq!(movies[0].poster_url, "https://img/1.jpg");
}

#[test]
fn parse_csv_accepts_reordered_columns() {
    let body = "title,year,id,poster_url,plot,actors,director,genre\nHeat,1995,9,,Cops.,Al Pacino,Michael Mann,Crime\n";
    let movies = parse_csv(body).unwrap();
    assert_eq!(movies[0].director, "Michael Mann");
    assert_eq!(movies[0].genre, "Crime");
    assert_eq!(movies[0].poster_url, "");
}

#[test]
fn parse_csv_missing_column_is_rejected() {
    let body = "id,title,year,genre,director,actors,plot\n1,X,2000,Drama,D,A,P\n";
    let err = parse_csv(body).unwrap_err();
    assert!(matches!(err, MovieError::MissingColumns));
    assert_eq!(
        err.to_string(),
        "CSV must contain columns: id, title, year, genre, director, actors, plot, poster_url"
    );
}

#[test]
fn parse_csv_invalid_year_is_rejected() {
    let body = format!("{HEADER}\n1,X,nineteen,Drama,D,A,P,\n");
    assert!(matches!(parse_csv(&body), Err(MovieError::Csv(_))));
}

#[test]
fn parse_csv_header_only_is_empty() {
    assert!(parse_csv(HEADER).unwrap().is_empty());
}
