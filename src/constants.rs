pub mod eutils {

    pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

    pub const ESEARCH_ENDPOINT: &str = "esearch.fcgi";

    pub const SERVICE_NAME: &str = "NCBI E-utilities";
}

pub mod limits {

    /// Upper bound on ids kept in a normalized result.
    pub const MAX_ID_LIST: usize = 1000;

    pub const MIN_RETMAX: u32 = 1;

    pub const MAX_RETMAX: u32 = 100;

    pub const DEFAULT_RETMAX: u32 = 20;
}
