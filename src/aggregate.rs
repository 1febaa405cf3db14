use crate::models::ScrapedSong;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Key songs by hash. The first occurrence of a hash wins; later duplicates
/// (overlapping pages, repeated authors) are dropped.
pub fn aggregate<I>(songs: I) -> HashMap<String, ScrapedSong>
where
    I: IntoIterator<Item = ScrapedSong>,
{
    let mut by_hash = HashMap::new();
    merge_into(&mut by_hash, songs);
    by_hash
}

/// Add songs to an existing map without replacing entries already present.
/// Returns how many new hashes were added.
pub fn merge_into<I>(by_hash: &mut HashMap<String, ScrapedSong>, songs: I) -> usize
where
    I: IntoIterator<Item = ScrapedSong>,
{
    let mut added = 0;
    for song in songs {
        if let Entry::Vacant(slot) = by_hash.entry(song.hash().to_string()) {
            slot.insert(song);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(hash: &str, name: &str) -> ScrapedSong {
        let mut song = ScrapedSong::new(hash);
        song.song_name = Some(name.to_string());
        song
    }

    #[test]
    fn test_first_occurrence_wins_case_insensitively() {
        let map = aggregate(vec![song("AA", "v1"), song("aa", "v2")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["AA"].song_name.as_deref(), Some("v1"));
    }

    #[test]
    fn test_distinct_hashes_are_kept() {
        let map = aggregate(vec![song("aa", "a"), song("bb", "b"), song("AA", "dup")]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["AA"].song_name.as_deref(), Some("a"));
        assert_eq!(map["BB"].song_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_merge_into_keeps_existing() {
        let mut map = aggregate(vec![song("aa", "original")]);
        let added = merge_into(&mut map, vec![song("AA", "late"), song("cc", "new")]);
        assert_eq!(added, 1);
        assert_eq!(map["AA"].song_name.as_deref(), Some("original"));
        assert!(map.contains_key("CC"));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
