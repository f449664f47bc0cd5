pub mod apriori;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod itemset;
pub mod recommend;

pub use apriori::{
    apriori, generate_rules, mine_itemsets, try_mine_itemsets, AprioriOutput, AprioriParams,
    FrequentItemsetMiner, FrequentItemsets, ItemsetCount, ItemsetSummary, MiningParams, Rule,
    RuleGenerator, RuleMetrics, RuleParams, TransactionIndex,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use dataset::{DatasetFormat, Transaction};
pub use errors::{ApplicationError, InterfaceError, MiningError};
pub use itemset::{Item, Itemset};
pub use recommend::{recommend, Recommendation, RecommendationEngine, RecommendationRequest};
