//! Ingredient vocabulary for the PlateLens classifier
//!
//! The label list is index-aligned with the classifier head of the
//! `ssevan/ug-food-detector` checkpoint: logit `i` scores label
//! `INGREDIENT_LABELS[i]`. Entries are carried verbatim from the trained
//! checkpoint, including irregular casing and underscores, so the order
//! and spelling here must never be edited independently of the weights.

/// All ingredient labels the classifier can emit, in logit order.
pub const INGREDIENT_LABELS: [&str; 40] = [
    "ugandan_rolex",
    "milk",
    "chicken_stew",
    "fish_stew",
    "nakati",
    "utensils",
    "peas_soup",
    "millet",
    "pumpkin",
    "_roasted_groundnuts",
    "beans_soup",
    "pilau",
    "sweet_potatoes",
    "Ground_nut_sauce",
    "banana_leaves",
    "chapati_street_food",
    "nsenene",
    "boiled_cassava",
    "irish_potatoes",
    "cassava",
    "chai",
    "yams",
    "ground_nuts",
    "beans",
    "tomatoes",
    "eggs",
    "maize",
    "posho",
    "beef_stew",
    "samosa",
    "matooke",
    "pumpkin_soup",
    "katogo",
    "onions",
    "matooke_meal",
    "ugandan_local_food",
    "pork_stew",
    "garlic",
    "peas",
    "rice",
];
