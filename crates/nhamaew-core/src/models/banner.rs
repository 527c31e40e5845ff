use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Banner {
    pub name: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Home page tile for one kind of pet; `animal_type` feeds the category menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct AnimalCategory {
    pub name: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "animalType")]
    pub animal_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct BannerAndCategoryData {
    #[serde(rename = "bannerList", default)]
    pub banner_list: Vec<Banner>,
    #[serde(rename = "animalCategoryList", default)]
    pub animal_category_list: Vec<AnimalCategory>,
}
