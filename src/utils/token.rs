use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const RESPONSE_TOKEN_LENGTH: usize = 32;

pub fn generate_response_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESPONSE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_sized() {
        let a = generate_response_token();
        let b = generate_response_token();
        assert_eq!(a.len(), RESPONSE_TOKEN_LENGTH);
        assert_ne!(a, b);
    }
}
