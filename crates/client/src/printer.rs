//! ESC/POS receipt encoding.
//!
//! Pure transformations from an order plus its line items into the flat
//! byte sequence a thermal printer consumes. Two document kinds: the
//! kitchen ticket ([`format_comanda`]) and the customer invoice grouped
//! by payer ([`format_factura`]). The resulting fragments are flattened
//! with [`to_raw_bytes`] and handed to the print transport.
//!
//! Missing data (restaurant name, product name, unparsable amounts)
//! degrades to safe defaults instead of failing: a receipt that prints
//! incompletely beats one that never prints.

use chrono::{DateTime, Local};

use comandero_shared::ItemPedido;

const ESC: char = '\u{1b}';
const GS: char = '\u{1d}';

/// Column width of the 58 mm ticket in font A.
const LINE_WIDTH: usize = 32;
const DIVIDER: &str = "--------------------------------\n";

const ALIGN_LEFT: u8 = 0x00;
const ALIGN_CENTER: u8 = 0x01;
const ALIGN_RIGHT: u8 = 0x02;

const MODE_NORMAL: u8 = 0x00;
const MODE_BOLD: u8 = 0x08;
const MODE_DOUBLE_HEIGHT: u8 = 0x10;
const MODE_DOUBLE_SIZE: u8 = 0x30;

/// Order header data for a printable document. `total` is the recorded
/// order total; when absent the encoder falls back to the item sum.
#[derive(Debug, Clone, Default)]
pub struct ReceiptOrder {
    pub id: i64,
    pub mesa_nombre: Option<String>,
    pub nombre_pedido: Option<String>,
    pub total: Option<String>,
}

fn align(n: u8) -> String {
    format!("{ESC}a{}", n as char)
}

fn mode(n: u8) -> String {
    format!("{ESC}!{}", n as char)
}

fn init() -> [String; 2] {
    // ESC @ resets the printer; ESC t 0 selects code page PC437.
    [format!("{ESC}@"), format!("{ESC}t\u{0}")]
}

fn cut() -> String {
    format!("{GS}V\u{41}\u{0}")
}

fn parse_monto(texto: &str) -> f64 {
    texto.trim().parse().unwrap_or(0.0)
}

fn nombre_de(item: &ItemPedido) -> &str {
    item.nombre_producto.as_deref().unwrap_or("Producto")
}

/// es-AR convention: thousands separated with '.', decimals with ','.
fn format_number(value: f64, decimals: usize) -> String {
    let raw = format!("{value:.decimals$}");
    let (entero, fraccion) = match raw.split_once('.') {
        Some((e, f)) => (e.to_string(), Some(f.to_string())),
        None => (raw, None),
    };
    let (signo, digitos) = match entero.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", entero.as_str()),
    };
    let mut agrupado = String::new();
    for (i, ch) in digitos.chars().enumerate() {
        if i > 0 && (digitos.len() - i) % 3 == 0 {
            agrupado.push('.');
        }
        agrupado.push(ch);
    }
    match fraccion {
        Some(f) => format!("{signo}{agrupado},{f}"),
        None => format!("{signo}{agrupado}"),
    }
}

fn format_monto(value: f64) -> String {
    format_number(value, 2)
}

/// Quantities keep 3 decimals to support weighed items.
fn format_cantidad(value: f64) -> String {
    format_number(value, 3)
}

/// Left text padded/truncated so `right` ends at the last column.
fn columns(left: &str, right: &str) -> String {
    let ancho_derecha = right.chars().count();
    let max_izquierda = LINE_WIDTH.saturating_sub(ancho_derecha + 1);
    let izquierda: String = left.chars().take(max_izquierda).collect();
    let relleno = LINE_WIDTH
        .saturating_sub(izquierda.chars().count())
        .saturating_sub(ancho_derecha);
    format!("{izquierda}{}{right}\n", " ".repeat(relleno))
}

/// The recorded order total wins over a recomputation from the items.
fn total_del_documento(pedido: &ReceiptOrder, items: &[ItemPedido]) -> f64 {
    match pedido.total.as_deref() {
        Some(total) => parse_monto(total),
        None => items
            .iter()
            .map(|i| i.cantidad * parse_monto(&i.precio_unitario))
            .sum(),
    }
}

fn push_header(
    commands: &mut Vec<String>,
    pedido: &ReceiptOrder,
    restaurante: &str,
    now: DateTime<Local>,
) {
    commands.extend(init());
    commands.push(align(ALIGN_CENTER));
    commands.push(mode(MODE_DOUBLE_SIZE));
    commands.push(format!("{restaurante}\n"));
    commands.push(mode(MODE_NORMAL));
    commands.push(DIVIDER.to_string());

    commands.push(align(ALIGN_LEFT));
    commands.push(mode(MODE_BOLD));
    commands.push(format!("Pedido: #{}\n", pedido.id));
    commands.push(format!("Fecha: {}\n", now.format("%d/%m/%Y %H:%M")));
    if let Some(mesa) = &pedido.mesa_nombre {
        commands.push(format!("Mesa: {mesa}\n"));
    }
    if let Some(cliente) = &pedido.nombre_pedido {
        commands.push(format!("Cliente: {cliente}\n"));
    }
    commands.push(mode(MODE_NORMAL));
    commands.push(DIVIDER.to_string());
}

fn push_footer(commands: &mut Vec<String>) {
    commands.push(mode(MODE_NORMAL));
    commands.push(align(ALIGN_CENTER));
    commands.push("¡Gracias por su visita!\n".to_string());
    commands.push("\n\n\n\n".to_string());
    commands.push(cut());
}

/// Kitchen ticket for the current wall-clock time.
pub fn format_comanda(
    pedido: &ReceiptOrder,
    items: &[ItemPedido],
    restaurante: &str,
) -> Vec<String> {
    format_comanda_at(pedido, items, restaurante, Local::now())
}

/// Kitchen ticket with an injected timestamp; output is deterministic for
/// a given input.
pub fn format_comanda_at(
    pedido: &ReceiptOrder,
    items: &[ItemPedido],
    restaurante: &str,
    now: DateTime<Local>,
) -> Vec<String> {
    let mut commands = Vec::new();
    push_header(&mut commands, pedido, restaurante, now);

    for item in items {
        let unitario = parse_monto(&item.precio_unitario);
        let subtotal = item.cantidad * unitario;
        commands.push(format!(
            "{} x {}\n",
            format_cantidad(item.cantidad),
            format_monto(unitario)
        ));
        commands.push(mode(MODE_BOLD));
        commands.push(columns(nombre_de(item), &format_monto(subtotal)));
        commands.push(mode(MODE_NORMAL));
        if !item.ingredientes_excluidos_nombres.is_empty() {
            commands.push(format!(
                "   SIN: {}\n",
                item.ingredientes_excluidos_nombres.join(", ")
            ));
        }
    }

    commands.push(DIVIDER.to_string());
    commands.push(align(ALIGN_RIGHT));
    commands.push(mode(MODE_DOUBLE_HEIGHT));
    commands.push(format!(
        "TOTAL: {}\n",
        format_monto(total_del_documento(pedido, items))
    ));
    push_footer(&mut commands);
    commands
}

/// Customer invoice for the current wall-clock time.
pub fn format_factura(
    pedido: &ReceiptOrder,
    items: &[ItemPedido],
    restaurante: &str,
) -> Vec<String> {
    format_factura_at(pedido, items, restaurante, Local::now())
}

/// Customer invoice with an injected timestamp. Items are grouped by
/// payer in first-seen order, each group closing with its subtotal.
pub fn format_factura_at(
    pedido: &ReceiptOrder,
    items: &[ItemPedido],
    restaurante: &str,
    now: DateTime<Local>,
) -> Vec<String> {
    let mut grupos: Vec<(String, Vec<&ItemPedido>)> = Vec::new();
    for item in items {
        let nombre = if item.cliente_nombre.trim().is_empty() {
            "Sin nombre".to_string()
        } else {
            item.cliente_nombre.clone()
        };
        match grupos.iter_mut().find(|(n, _)| *n == nombre) {
            Some((_, grupo)) => grupo.push(item),
            None => grupos.push((nombre, vec![item])),
        }
    }

    let mut commands = Vec::new();
    push_header(&mut commands, pedido, restaurante, now);

    for (nombre, grupo) in &grupos {
        commands.push(mode(MODE_BOLD));
        commands.push(format!("{nombre}\n"));
        commands.push(mode(MODE_NORMAL));

        let mut subtotal_grupo = 0.0;
        for item in grupo {
            let unitario = parse_monto(&item.precio_unitario);
            let subtotal = item.cantidad * unitario;
            subtotal_grupo += subtotal;
            commands.push(columns(nombre_de(item), &format_monto(subtotal)));
            commands.push(format!(
                "  {} x {}\n",
                format_cantidad(item.cantidad),
                format_monto(unitario)
            ));
            if !item.ingredientes_excluidos_nombres.is_empty() {
                commands.push(format!(
                    "   SIN: {}\n",
                    item.ingredientes_excluidos_nombres.join(", ")
                ));
            }
        }

        commands.push(mode(MODE_BOLD));
        commands.push(columns("Subtotal", &format_monto(subtotal_grupo)));
        commands.push(mode(MODE_NORMAL));
        commands.push("\n".to_string());
    }

    commands.push(DIVIDER.to_string());
    commands.push(align(ALIGN_RIGHT));
    commands.push(mode(MODE_BOLD | MODE_DOUBLE_HEIGHT));
    commands.push(format!(
        "TOTAL: {}\n",
        format_monto(total_del_documento(pedido, items))
    ));
    push_footer(&mut commands);
    commands
}

/// Flatten command fragments to printer-ready bytes. Characters map to
/// their Latin-1 code points, so control sequences pass byte-for-byte;
/// anything above U+00FF becomes `?`.
pub fn to_raw_bytes(fragments: &[String]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for fragment in fragments {
        for ch in fragment.chars() {
            let code = ch as u32;
            bytes.push(if code <= 0xFF { code as u8 } else { b'?' });
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 1, 12, 30, 0).unwrap()
    }

    fn item(nombre: &str, cliente: &str, cantidad: f64, precio: &str) -> ItemPedido {
        ItemPedido {
            id: 1,
            producto_id: 10,
            cliente_nombre: cliente.to_string(),
            cantidad,
            precio_unitario: precio.to_string(),
            nombre_producto: Some(nombre.to_string()),
            imagen_url: None,
            ingredientes_excluidos: vec![],
            ingredientes_excluidos_nombres: vec![],
            post_confirmacion: None,
        }
    }

    fn decode(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| b as char).collect()
    }

    #[test]
    fn comanda_contains_order_id_and_total() {
        let pedido = ReceiptOrder {
            id: 7,
            total: Some("25.00".into()),
            ..Default::default()
        };
        let items = vec![item("Cafe", "Juan", 2.0, "5.00")];
        let bytes = to_raw_bytes(&format_comanda_at(&pedido, &items, "La Esquina", fixed_now()));
        let texto = decode(&bytes);

        assert!(texto.contains("Pedido: #7"));
        // The recorded total wins over the 10,00 the items would add to.
        assert!(texto.contains("TOTAL: 25,00"));
        assert!(texto.contains("25"));
        assert!(texto.contains("00"));
        assert!(texto.contains("2,000 x 5,00"));
    }

    #[test]
    fn encoding_is_deterministic_for_a_fixed_timestamp() {
        let pedido = ReceiptOrder { id: 7, total: Some("25.00".into()), ..Default::default() };
        let items = vec![item("Cafe", "Juan", 2.0, "5.00")];
        let now = fixed_now();
        let first = to_raw_bytes(&format_comanda_at(&pedido, &items, "La Esquina", now));
        let second = to_raw_bytes(&format_comanda_at(&pedido, &items, "La Esquina", now));
        assert_eq!(first, second);

        let first = to_raw_bytes(&format_factura_at(&pedido, &items, "La Esquina", now));
        let second = to_raw_bytes(&format_factura_at(&pedido, &items, "La Esquina", now));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_order_total_falls_back_to_the_item_sum() {
        let pedido = ReceiptOrder { id: 3, ..Default::default() };
        let items = vec![item("Cafe", "Juan", 2.0, "5.00"), item("Tostado", "Ana", 1.0, "7.50")];
        let texto = decode(&to_raw_bytes(&format_comanda_at(
            &pedido, &items, "La Esquina", fixed_now(),
        )));
        assert!(texto.contains("TOTAL: 17,50"));
    }

    #[test]
    fn item_name_line_is_padded_to_the_ticket_width() {
        let line = columns("Cafe", "10,00");
        assert_eq!(line.chars().count(), LINE_WIDTH + 1);
        assert!(line.ends_with("10,00\n"));
        assert!(line.starts_with("Cafe "));

        // Over-long names are truncated, keeping the subtotal aligned.
        let largo = "Milanesa napolitana con papas fritas";
        let line = columns(largo, "1.234,50");
        assert_eq!(line.chars().count(), LINE_WIDTH + 1);
        assert!(line.ends_with("1.234,50\n"));
    }

    #[test]
    fn quantities_use_three_decimals_and_grouping() {
        assert_eq!(format_cantidad(2.0), "2,000");
        assert_eq!(format_cantidad(0.25), "0,250");
        assert_eq!(format_cantidad(1234.5), "1.234,500");
        assert_eq!(format_monto(1234567.891), "1.234.567,89");
    }

    #[test]
    fn excluded_ingredients_render_indented() {
        let mut con_exclusiones = item("Hamburguesa", "Juan", 1.0, "12.00");
        con_exclusiones.ingredientes_excluidos_nombres =
            vec!["cebolla".to_string(), "tomate".to_string()];
        let texto = decode(&to_raw_bytes(&format_comanda_at(
            &ReceiptOrder { id: 1, ..Default::default() },
            &[con_exclusiones],
            "La Esquina",
            fixed_now(),
        )));
        assert!(texto.contains("   SIN: cebolla, tomate"));
    }

    #[test]
    fn factura_groups_items_by_payer_in_first_seen_order() {
        let pedido = ReceiptOrder { id: 9, ..Default::default() };
        let items = vec![
            item("Cafe", "Juan", 1.0, "5.00"),
            item("Medialuna", "Ana", 2.0, "2.00"),
            item("Tostado", "Juan", 1.0, "8.00"),
            item("Licuado", "", 1.0, "6.00"),
        ];
        let texto = decode(&to_raw_bytes(&format_factura_at(
            &pedido, &items, "La Esquina", fixed_now(),
        )));

        let juan = texto.find("Juan").unwrap();
        let ana = texto.find("Ana").unwrap();
        let sin_nombre = texto.find("Sin nombre").unwrap();
        assert!(juan < ana && ana < sin_nombre);

        // Juan: 5,00 + 8,00.
        assert!(texto.contains(&columns("Subtotal", "13,00")));
        assert!(texto.contains("TOTAL: 23,00"));
    }

    #[test]
    fn bytes_preserve_latin1_and_control_codes() {
        let fragments = vec![format!("{ESC}@"), "Ñoquis €\n".to_string()];
        let bytes = to_raw_bytes(&fragments);
        assert_eq!(bytes[0], 0x1B);
        assert_eq!(bytes[1], b'@');
        assert_eq!(bytes[2], 0xD1); // Ñ
        // The euro sign has no Latin-1 slot and degrades to '?'.
        assert!(bytes.contains(&b'?'));
        assert_eq!(*bytes.last().unwrap(), b'\n');
    }

    #[test]
    fn empty_restaurant_name_still_renders() {
        let pedido = ReceiptOrder { id: 1, ..Default::default() };
        let bytes = to_raw_bytes(&format_comanda_at(&pedido, &[], "", fixed_now()));
        assert!(!bytes.is_empty());
        assert!(decode(&bytes).contains("Pedido: #1"));
    }
}
