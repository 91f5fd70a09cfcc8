use crate::session::{
    DexId,
    RenderStyle,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_API_URL: &str = "https://pokeapi.co/api/v2";

/// Read-only lookup into the public Pokémon catalog.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PokemonMetadata {
    pub id: DexId,
    pub name: String,
    pub species_name: String,
    pub types: Vec<TypeKind>,
    pub sprites: SpriteSet,
}

impl PokemonMetadata {
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn primary_type(&self) -> Option<TypeKind> {
        self.types.first().copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteSet {
    pub pixel: Option<String>,
    pub hd: Option<String>,
    pub showdown: Option<String>,
}

impl SpriteSet {
    pub fn for_style(&self, style: RenderStyle) -> Option<&str> {
        let preferred = match style {
            RenderStyle::Pixel => &self.pixel,
            RenderStyle::Hd => &self.hd,
            RenderStyle::Showdown => &self.showdown,
        };
        preferred.as_deref().or(self.pixel.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesMetadata {
    pub is_baby: bool,
    pub flavor_text: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Bug,
    Dark,
    Dragon,
    Electric,
    Fairy,
    Fighting,
    Fire,
    Flying,
    Ghost,
    Grass,
    Ground,
    Ice,
    Normal,
    Poison,
    Psychic,
    Rock,
    Steel,
    Water,
}

impl TypeKind {
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Bug => "bug",
            TypeKind::Dark => "dark",
            TypeKind::Dragon => "dragon",
            TypeKind::Electric => "electric",
            TypeKind::Fairy => "fairy",
            TypeKind::Fighting => "fighting",
            TypeKind::Fire => "fire",
            TypeKind::Flying => "flying",
            TypeKind::Ghost => "ghost",
            TypeKind::Grass => "grass",
            TypeKind::Ground => "ground",
            TypeKind::Ice => "ice",
            TypeKind::Normal => "normal",
            TypeKind::Poison => "poison",
            TypeKind::Psychic => "psychic",
            TypeKind::Rock => "rock",
            TypeKind::Steel => "steel",
            TypeKind::Water => "water",
        }
    }

    // Lenient on purpose: an unrecognised type name drops the type instead of
    // failing the whole fetch.
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw {
            "bug" => Some(TypeKind::Bug),
            "dark" => Some(TypeKind::Dark),
            "dragon" => Some(TypeKind::Dragon),
            "electric" => Some(TypeKind::Electric),
            "fairy" => Some(TypeKind::Fairy),
            "fighting" => Some(TypeKind::Fighting),
            "fire" => Some(TypeKind::Fire),
            "flying" => Some(TypeKind::Flying),
            "ghost" => Some(TypeKind::Ghost),
            "grass" => Some(TypeKind::Grass),
            "ground" => Some(TypeKind::Ground),
            "ice" => Some(TypeKind::Ice),
            "normal" => Some(TypeKind::Normal),
            "poison" => Some(TypeKind::Poison),
            "psychic" => Some(TypeKind::Psychic),
            "rock" => Some(TypeKind::Rock),
            "steel" => Some(TypeKind::Steel),
            "water" => Some(TypeKind::Water),
            _ => None,
        }
    }
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for catalog")?;
        Ok(Self { base_url, http })
    }

    pub async fn get_pokemon(&self, id: DexId) -> Result<PokemonMetadata> {
        let url = format!("{}/pokemon/{}", self.base_url, id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("catalog request failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "catalog responded with {status} when fetching pokemon {id}: {body}"
            ));
        }
        let dto: PokemonDto = res
            .json()
            .await
            .wrap_err("invalid catalog pokemon payload")?;
        Ok(dto.into())
    }

    pub async fn get_species(&self, name: &str) -> Result<Option<SpeciesMetadata>> {
        let url = format!("{}/pokemon-species/{}", self.base_url, name);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("catalog request failed")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "catalog responded with {status} when fetching species {name}: {body}"
            ));
        }
        let dto: SpeciesDto = res
            .json()
            .await
            .wrap_err("invalid catalog species payload")?;
        Ok(Some(dto.into()))
    }
}

impl fmt::Display for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct PokemonDto {
    id: u16,
    name: String,
    species: NamedResourceDto,
    types: Vec<TypeSlotDto>,
    sprites: SpritesDto,
}

#[derive(Deserialize)]
struct NamedResourceDto {
    name: String,
}

#[derive(Deserialize)]
struct TypeSlotDto {
    slot: u8,
    #[serde(rename = "type")]
    type_ref: NamedResourceDto,
}

#[derive(Deserialize, Default)]
struct SpritesDto {
    front_default: Option<String>,
    other: Option<OtherSpritesDto>,
}

#[derive(Deserialize, Default)]
struct OtherSpritesDto {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<ArtworkDto>,
    showdown: Option<ArtworkDto>,
}

#[derive(Deserialize)]
struct ArtworkDto {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct SpeciesDto {
    is_baby: bool,
    flavor_text_entries: Vec<FlavorTextDto>,
}

#[derive(Deserialize)]
struct FlavorTextDto {
    flavor_text: String,
    language: NamedResourceDto,
}

impl From<PokemonDto> for PokemonMetadata {
    fn from(dto: PokemonDto) -> Self {
        let mut slots = dto.types;
        slots.sort_by_key(|slot| slot.slot);
        let types = slots
            .into_iter()
            .filter_map(|slot| TypeKind::from_name(&slot.type_ref.name))
            .collect();
        let other = dto.sprites.other.unwrap_or_default();
        PokemonMetadata {
            id: dto.id,
            name: dto.name,
            species_name: dto.species.name,
            types,
            sprites: SpriteSet {
                pixel: dto.sprites.front_default,
                hd: other
                    .official_artwork
                    .and_then(|artwork| artwork.front_default),
                showdown: other.showdown.and_then(|artwork| artwork.front_default),
            },
        }
    }
}

impl From<SpeciesDto> for SpeciesMetadata {
    fn from(dto: SpeciesDto) -> Self {
        let flavor_text = dto
            .flavor_text_entries
            .into_iter()
            .find(|entry| entry.language.name == "en")
            .map(|entry| normalize_flavor_text(&entry.flavor_text));
        SpeciesMetadata {
            is_baby: dto.is_baby,
            flavor_text,
        }
    }
}

// Dex flavor text carries form feeds and hard line breaks from the games.
fn normalize_flavor_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const POKEMON_JSON: &str = r#"{
        "id": 428,
        "name": "lopunny",
        "species": { "name": "lopunny" },
        "types": [
            { "slot": 1, "type": { "name": "normal" } }
        ],
        "sprites": {
            "front_default": "https://sprites/428.png",
            "other": {
                "official-artwork": { "front_default": "https://art/428.png" },
                "showdown": { "front_default": "https://showdown/428.gif" }
            }
        }
    }"#;

    #[test]
    fn pokemon_dto__converts_into_domain_metadata() {
        // given
        let dto: PokemonDto = serde_json::from_str(POKEMON_JSON).unwrap();

        // when
        let pokemon: PokemonMetadata = dto.into();

        // then
        assert_eq!(pokemon.id, 428);
        assert_eq!(pokemon.display_name(), "Lopunny");
        assert_eq!(pokemon.types, vec![TypeKind::Normal]);
        assert_eq!(
            pokemon.sprites.for_style(RenderStyle::Hd),
            Some("https://art/428.png")
        );
        assert_eq!(
            pokemon.sprites.for_style(RenderStyle::Showdown),
            Some("https://showdown/428.gif")
        );
    }

    #[test]
    fn sprite_set__falls_back_to_pixel_art_when_a_variant_is_missing() {
        // given
        let sprites = SpriteSet {
            pixel: Some("pixel.png".to_string()),
            hd: None,
            showdown: None,
        };

        // when / then
        assert_eq!(sprites.for_style(RenderStyle::Hd), Some("pixel.png"));
    }

    #[test]
    fn species_dto__keeps_the_english_flavor_text_and_baby_flag() {
        // given
        let json = r#"{
            "is_baby": true,
            "flavor_text_entries": [
                { "flavor_text": "Eine Drachen-Notiz.", "language": { "name": "de" } },
                { "flavor_text": "A playful\nlittle\fdragon.", "language": { "name": "en" } }
            ]
        }"#;
        let dto: SpeciesDto = serde_json::from_str(json).unwrap();

        // when
        let species: SpeciesMetadata = dto.into();

        // then
        assert!(species.is_baby);
        assert_eq!(
            species.flavor_text.as_deref(),
            Some("A playful little dragon.")
        );
    }

    #[test]
    fn pokemon_dto__drops_unrecognised_type_names() {
        // given
        let json = r#"{
            "id": 1,
            "name": "bulbasaur",
            "species": { "name": "bulbasaur" },
            "types": [
                { "slot": 2, "type": { "name": "poison" } },
                { "slot": 1, "type": { "name": "grass" } },
                { "slot": 3, "type": { "name": "stellar" } }
            ],
            "sprites": { "front_default": null }
        }"#;
        let dto: PokemonDto = serde_json::from_str(json).unwrap();

        // when
        let pokemon: PokemonMetadata = dto.into();

        // then
        assert_eq!(pokemon.types, vec![TypeKind::Grass, TypeKind::Poison]);
        assert_eq!(pokemon.primary_type(), Some(TypeKind::Grass));
    }
}
