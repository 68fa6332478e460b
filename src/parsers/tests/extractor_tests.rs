use crate::error::ExtractionError;
use crate::offer::Offer;
use crate::parsers::collect_offers;

mod tests {
    use super::*;

    #[test]
    fn test_failures_are_dropped() {
        let results = vec![
            Ok(Offer::new("A", "$1", 99, "https://x/a")),
            Err(ExtractionError::MissingDiscount),
            Ok(Offer::new("B", "$2", 50, "https://x/b")),
            Err(ExtractionError::DiscountOutOfRange(300)),
        ];

        let offers = collect_offers("https://x/deals", results);
        let links: Vec<_> = offers.iter().map(|o| o.link.as_str()).collect();
        assert_eq!(links, vec!["https://x/a", "https://x/b"]);
    }

    #[test]
    fn test_offers_without_link_are_dropped() {
        let results = vec![
            Ok(Offer::new("No link", "$1", 99, "")),
            Ok(Offer::new("Linked", "$1", 99, "https://x/a")),
        ];

        let offers = collect_offers("https://x/deals", results);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].name, "Linked");
    }

    #[test]
    fn test_empty_input() {
        assert!(collect_offers("https://x/deals", Vec::new()).is_empty());
    }
}
