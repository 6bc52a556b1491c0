pub mod aggregator;
pub mod assembler;
pub mod decomposer;
pub mod fetcher;
pub mod selector;
pub mod synthesizer;

pub use aggregator::SearchAggregator;
pub use assembler::ContextAssembler;
pub use decomposer::QueryDecomposer;
pub use fetcher::ContentFetcher;
pub use selector::SourceSelector;
pub use synthesizer::Synthesizer;
