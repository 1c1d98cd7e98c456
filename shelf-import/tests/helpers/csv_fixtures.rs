//! CSV file builders

pub const HEADER: &str = "titel,autor,beschreibung,genre,bewertung,bild_url,amazon_link";

/// A CSV file with the standard header and the given data lines
pub fn books_csv(lines: &[String]) -> Vec<u8> {
    let mut content = String::from(HEADER);
    content.push('\n');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    content.into_bytes()
}

/// `count` valid rows titled "Title 1".."Title N" by "Author 1".."Author N"
pub fn numbered_rows(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("Title {i},Author {i},,Roman,3,,"))
        .collect()
}
