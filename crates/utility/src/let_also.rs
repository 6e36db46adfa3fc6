/// Kotlin style scope function for continuing a method chain.
pub trait LetAlso: Sized {
    /// Passes `self` by value into `f` and returns its result.
    fn let_owned<R, F>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> LetAlso for T {}

#[cfg(test)]
mod tests {
    use super::LetAlso;

    #[test]
    fn let_owned_maps_value() {
        let length = "campus".to_owned().let_owned(|s| s.len());
        assert_eq!(length, 6);
    }

    #[test]
    fn let_owned_continues_a_result_chain() {
        let parsed: Result<u8, String> = "7"
            .parse::<u8>()
            .map_err(|why| why.to_string())
            .let_owned(|result| result.map(|n| n * 2));
        assert_eq!(parsed, Ok(14));
    }
}
