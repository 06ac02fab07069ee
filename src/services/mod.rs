pub mod itinerary_service;

pub use itinerary_service::ItineraryService;
